use super::errors::UpstreamError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::models::RetryConfig;

/// Retry policy for transient upstream errors
///
/// Runs an operation up to `max_retries + 1` times. The delay before retry
/// `k` (1-based) is `base_delay * k`: linear, without jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    max_retries: u32,
    /// Base delay between attempts
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Example
    /// ```
    /// use fonpick::infrastructure::upstream::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(2, Duration::from_millis(500));
    /// assert_eq!(policy.max_attempts(), 3);
    /// ```
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Build from configuration
    pub const fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.base_delay_ms))
    }

    /// Total number of calls the policy may make
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Execute an operation, retrying transient failures
    ///
    /// # Returns
    /// * `Ok(T)` - Operation succeeded
    /// * `Err(UpstreamError)` - Permanent failure, or the last transient
    ///   failure once the budget is spent
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("Upstream call succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if self.should_retry(&err, attempt) {
                        attempt += 1;
                        let delay = self.delay_for(attempt);
                        warn!(
                            "Attempt {} failed with transient error: {}. Retrying in {:?}...",
                            attempt, err, delay
                        );
                        sleep(delay).await;
                    } else {
                        if attempt >= self.max_retries && err.is_transient() {
                            warn!("Upstream call failed after {} attempts: {}", attempt + 1, err);
                        } else {
                            debug!("Permanent error, not retrying: {}", err);
                        }
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Delay before retry `retry` (1-based)
    fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(retry)
    }

    fn should_retry(&self, error: &UpstreamError, attempt: u32) -> bool {
        attempt < self.max_retries && error.is_transient()
    }
}

impl Default for RetryPolicy {
    /// Two retries, 500ms base delay
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn server_error() -> UpstreamError {
        UpstreamError::ServerError(StatusCode::INTERNAL_SERVER_ERROR)
    }

    #[test]
    fn test_linear_delay() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));

        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(1500));
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::new(2, Duration::from_millis(500));

        assert!(policy.should_retry(&UpstreamError::RateLimited, 0));
        assert!(policy.should_retry(&UpstreamError::Timeout, 1));
        assert!(!policy.should_retry(&server_error(), 2));
        assert!(!policy.should_retry(&UpstreamError::ClientError(StatusCode::NOT_FOUND), 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_makes_max_retries_plus_one_calls() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(server_error())
                }
            })
            .await;

        assert!(matches!(result, Err(UpstreamError::ServerError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(UpstreamError::ClientError(StatusCode::NOT_FOUND))
                }
            })
            .await;

        assert!(matches!(result, Err(UpstreamError::ClientError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_success() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));
        let started = tokio::time::Instant::now();

        let result = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(server_error())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(500) && waited < Duration::from_millis(510));
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_backoff_is_linear() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let started = tokio::time::Instant::now();

        let _: Result<(), _> = policy.execute(|| async { Err(UpstreamError::Timeout) }).await;

        // 100 + 200 + 300
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(600) && waited < Duration::from_millis(650));
    }
}

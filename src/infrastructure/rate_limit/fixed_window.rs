//! Fixed-window request counter keyed by client identifier.
//!
//! Windows do not slide: a key's window starts at its first request and then
//! advances in whole multiples of the window length. Bursts straddling a
//! window boundary are allowed.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::models::RateLimitConfig;

/// Current counting window for one client key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitWindow {
    /// Start of the window
    pub window_start: Instant,
    /// Requests counted in this window
    pub count: u32,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// True when the request must be rejected
    pub exceeded: bool,
    /// End of the current window
    pub reset_at: Instant,
    /// Requests still allowed in this window
    pub remaining: u32,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, at least one.
    pub fn retry_after_secs(&self) -> u64 {
        let wait = self.reset_at.saturating_duration_since(Instant::now());
        let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
        secs.max(1)
    }
}

#[derive(Debug, Default)]
struct WindowTable {
    windows: HashMap<String, RateLimitWindow>,
    // Pruning runs at most once per window length.
    last_prune: Option<Instant>,
}

impl WindowTable {
    fn prune_expired(&mut self, now: Instant, window: Duration) {
        if self
            .last_prune
            .is_some_and(|at| now.duration_since(at) < window)
        {
            return;
        }
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.duration_since(w.window_start) < window);
        self.last_prune = Some(now);
        debug!(pruned = before - self.windows.len(), "pruned expired rate limit windows");
    }
}

/// Fixed-window rate limiter.
pub struct FixedWindowRateLimiter {
    table: Mutex<WindowTable>,
    max_requests: u32,
    window: Duration,
    max_tracked_keys: usize,
}

impl FixedWindowRateLimiter {
    /// Create a limiter from configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_limits(config.max_requests, config.window(), config.max_tracked_keys)
    }

    /// Create a limiter with explicit limits.
    pub fn with_limits(max_requests: u32, window: Duration, max_tracked_keys: usize) -> Self {
        Self {
            table: Mutex::new(WindowTable::default()),
            max_requests,
            window,
            max_tracked_keys: max_tracked_keys.max(1),
        }
    }

    /// Count one request for `client_key` and decide whether it is allowed.
    pub fn check(&self, client_key: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut table = self.table.lock();

        if table.windows.len() >= self.max_tracked_keys && !table.windows.contains_key(client_key) {
            table.prune_expired(now, self.window);
        }
        let windows = &mut table.windows;

        let current = match windows.get(client_key) {
            Some(existing) if now.duration_since(existing.window_start) < self.window => *existing,
            Some(existing) => RateLimitWindow {
                window_start: self.rolled_start(existing.window_start, now),
                count: 0,
            },
            None => RateLimitWindow {
                window_start: now,
                count: 0,
            },
        };

        let reset_at = current.window_start + self.window;
        if current.count >= self.max_requests {
            windows.insert(client_key.to_string(), current);
            debug!(client_key, "rate limit exceeded");
            return RateLimitDecision {
                exceeded: true,
                reset_at,
                remaining: 0,
            };
        }

        let count = current.count + 1;
        windows.insert(
            client_key.to_string(),
            RateLimitWindow {
                window_start: current.window_start,
                count,
            },
        );

        RateLimitDecision {
            exceeded: false,
            reset_at,
            remaining: self.max_requests - count,
        }
    }

    /// Window state for a key, if tracked.
    pub fn window(&self, client_key: &str) -> Option<RateLimitWindow> {
        self.table.lock().windows.get(client_key).copied()
    }

    /// Number of tracked client keys.
    pub fn tracked_keys(&self) -> usize {
        self.table.lock().windows.len()
    }

    /// Advance `start` by whole windows so that `now` falls inside.
    fn rolled_start(&self, start: Instant, now: Instant) -> Instant {
        let window_nanos = self.window.as_nanos().max(1);
        let elapsed = now.duration_since(start).as_nanos();
        let whole = elapsed / window_nanos * window_nanos;
        start + Duration::from_nanos(u64::try_from(whole).unwrap_or(u64::MAX))
    }
}

//! Cached proxy pipeline shared by every stock route.
//!
//! validate → rate-limit → cache → fetch (retrying) → cache-write → envelope.
//! Route handlers stay thin: they translate HTTP into a [`ProxyRequest`]
//! and a [`ProxyResponse`] back into HTTP.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::errors::{ProxyError, ProxyResult};
use crate::domain::models::{
    evaluate, Config, Fundamentals, ProxyEnvelope, StockResource, Symbol, Verdict,
};
use crate::domain::ports::StockDataSource;
use crate::infrastructure::cache::BoundedCache;
use crate::infrastructure::rate_limit::FixedWindowRateLimiter;
use crate::services::single_flight::SingleFlight;

/// Upstream data as stored in the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPayload {
    /// The upstream `data` field
    pub data: Value,
    /// When the upstream was read
    pub fetched_at: DateTime<Utc>,
}

/// One proxied request, already extracted from HTTP.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    /// Symbol as it appeared in the path
    pub raw_symbol: String,
    /// Requested resource
    pub resource: StockResource,
    /// Skip the cache read (the result is still written back)
    pub nocache: bool,
    /// Caller identity used for rate limiting
    pub client_key: String,
}

/// Envelope plus the HTTP details needed to send it.
#[derive(Debug, Clone)]
pub struct ProxyResponse<V> {
    /// HTTP status code
    pub status: u16,
    /// JSON body
    pub envelope: ProxyEnvelope<V>,
    /// `Retry-After` seconds for 429 responses
    pub retry_after_secs: Option<u64>,
}

impl<V> ProxyResponse<V> {
    /// Successful response.
    pub fn ok(symbol: &Symbol, data: V, fetched_at: DateTime<Utc>, cached: bool) -> Self {
        Self {
            status: 200,
            envelope: ProxyEnvelope::ok(symbol.as_str(), data, fetched_at, cached),
            retry_after_secs: None,
        }
    }

    /// Failure response for `symbol` (raw text when it did not validate).
    pub fn from_error(symbol: &str, err: &ProxyError) -> Self {
        Self {
            status: err.status_code(),
            envelope: ProxyEnvelope::failure(symbol, err.code(), err.to_string()),
            retry_after_secs: err.retry_after_secs(),
        }
    }
}

type FetchOutcome = ProxyResult<CachedPayload>;

/// Generic cached proxy over a [`StockDataSource`].
pub struct CachedProxy<S: StockDataSource + ?Sized + 'static> {
    source: Arc<S>,
    cache: Arc<BoundedCache<CachedPayload>>,
    limiter: Arc<FixedWindowRateLimiter>,
    single_flight: Option<SingleFlight<FetchOutcome>>,
}

impl<S: StockDataSource + ?Sized + 'static> CachedProxy<S> {
    /// Assemble a proxy from explicitly constructed parts.
    pub fn new(
        source: Arc<S>,
        cache: Arc<BoundedCache<CachedPayload>>,
        limiter: Arc<FixedWindowRateLimiter>,
        single_flight: bool,
    ) -> Self {
        Self {
            source,
            cache,
            limiter,
            single_flight: single_flight.then(SingleFlight::new),
        }
    }

    /// Build cache and limiter from configuration around `source`.
    pub fn from_config(source: Arc<S>, config: &Config) -> Self {
        Self::new(
            source,
            Arc::new(BoundedCache::new(&config.cache)),
            Arc::new(FixedWindowRateLimiter::new(&config.rate_limit)),
            config.proxy.single_flight,
        )
    }

    /// The response cache.
    pub fn cache(&self) -> &Arc<BoundedCache<CachedPayload>> {
        &self.cache
    }

    /// The per-client rate limiter.
    pub fn limiter(&self) -> &Arc<FixedWindowRateLimiter> {
        &self.limiter
    }

    /// Serve a raw upstream resource.
    pub async fn handle(&self, request: ProxyRequest) -> ProxyResponse<Value> {
        self.handle_with(request, |data| data).await
    }

    /// Serve a verdict computed from the (cached) statistics resource.
    pub async fn handle_verdict(
        &self,
        raw_symbol: String,
        nocache: bool,
        client_key: String,
    ) -> ProxyResponse<Verdict> {
        let request = ProxyRequest {
            raw_symbol,
            resource: StockResource::Statistics,
            nocache,
            client_key,
        };
        self.handle_with(request, |data| evaluate(&Fundamentals::from_value(&data)))
            .await
    }

    /// Run the pipeline and shape the payload with `transform`.
    pub async fn handle_with<V>(
        &self,
        request: ProxyRequest,
        transform: impl FnOnce(Value) -> V,
    ) -> ProxyResponse<V> {
        let symbol = match Symbol::parse(&request.raw_symbol) {
            Ok(symbol) => symbol,
            Err(err) => {
                debug!(symbol = %request.raw_symbol, "rejected invalid symbol");
                return ProxyResponse::from_error(&request.raw_symbol, &err);
            }
        };

        let limit_key = format!("{}:{}", request.client_key, symbol);
        let decision = self.limiter.check(&limit_key);
        if decision.exceeded {
            let err = ProxyError::RateLimited {
                retry_after_secs: decision.retry_after_secs(),
            };
            return ProxyResponse::from_error(symbol.as_str(), &err);
        }

        match self.fetch_cached(&symbol, request.resource, request.nocache).await {
            Ok((payload, cached)) => {
                ProxyResponse::ok(&symbol, transform(payload.data), payload.fetched_at, cached)
            }
            Err(err) => {
                warn!(%symbol, resource = request.resource.upstream_path(), error = %err, "proxy fetch failed");
                ProxyResponse::from_error(symbol.as_str(), &err)
            }
        }
    }

    /// Cache lookup, then upstream on miss. Returns the payload and whether it was a hit.
    async fn fetch_cached(
        &self,
        symbol: &Symbol,
        resource: StockResource,
        nocache: bool,
    ) -> ProxyResult<(CachedPayload, bool)> {
        let key = resource.cache_key(symbol);

        if !nocache {
            if let Some(hit) = self.cache.get(&key) {
                debug!(key = %key, "cache hit");
                return Ok((hit, true));
            }
        }
        debug!(key = %key, nocache, "cache miss");

        let payload = match &self.single_flight {
            Some(group) => {
                let source = Arc::clone(&self.source);
                let symbol = symbol.clone();
                group
                    .run(&key, move || async move { fetch_payload(source.as_ref(), &symbol, resource).await })
                    .await?
            }
            None => fetch_payload(self.source.as_ref(), symbol, resource).await?,
        };

        self.cache.set(key, payload.clone());
        Ok((payload, false))
    }
}

async fn fetch_payload<S: StockDataSource + ?Sized>(
    source: &S,
    symbol: &Symbol,
    resource: StockResource,
) -> FetchOutcome {
    let data = source.fetch(symbol, resource).await?;
    Ok(CachedPayload {
        data,
        fetched_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Scripted source: pops one response per call, repeating the last.
    struct ScriptedSource {
        responses: Mutex<VecDeque<ProxyResult<Value>>>,
        calls: AtomicU32,
        delay: Duration,
    }

    impl ScriptedSource {
        fn new(responses: Vec<ProxyResult<Value>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicU32::new(0),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StockDataSource for ScriptedSource {
        async fn fetch(&self, _symbol: &Symbol, _resource: StockResource) -> ProxyResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let mut responses = self.responses.lock();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap()
            }
        }
    }

    fn proxy(source: ScriptedSource, max_requests: u32, single_flight: bool) -> (CachedProxy<ScriptedSource>, Arc<ScriptedSource>) {
        let source = Arc::new(source);
        let proxy = CachedProxy::new(
            Arc::clone(&source),
            Arc::new(BoundedCache::with_limits(16, Duration::from_secs(60))),
            Arc::new(FixedWindowRateLimiter::with_limits(
                max_requests,
                Duration::from_secs(60),
                100,
            )),
            single_flight,
        );
        (proxy, source)
    }

    fn request(symbol: &str, nocache: bool) -> ProxyRequest {
        ProxyRequest {
            raw_symbol: symbol.to_string(),
            resource: StockResource::Overview,
            nocache,
            client_key: "10.0.0.1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (proxy, source) = proxy(ScriptedSource::new(vec![Ok(json!({"price": 34.75}))]), 10, false);

        let first = proxy.handle(request("ptt", false)).await;
        assert_eq!(first.status, 200);
        assert!(!first.envelope.meta.cached);
        assert_eq!(first.envelope.meta.symbol, "PTT");

        let second = proxy.handle(request("PTT", false)).await;
        assert!(second.envelope.meta.cached);
        assert_eq!(second.envelope.data, Some(json!({"price": 34.75})));
        assert_eq!(second.envelope.meta.fetched_at, first.envelope.meta.fetched_at);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_nocache_bypasses_read_but_writes_back() {
        let (proxy, source) = proxy(
            ScriptedSource::new(vec![Ok(json!({"v": 1})), Ok(json!({"v": 2}))]),
            10,
            false,
        );

        proxy.handle(request("PTT", false)).await;
        let bypass = proxy.handle(request("PTT", true)).await;
        assert!(!bypass.envelope.meta.cached);
        assert_eq!(bypass.envelope.data, Some(json!({"v": 2})));

        let after = proxy.handle(request("PTT", false)).await;
        assert!(after.envelope.meta.cached);
        assert_eq!(after.envelope.data, Some(json!({"v": 2})));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalid_symbol_touches_nothing() {
        let (proxy, source) = proxy(ScriptedSource::new(vec![Ok(json!({}))]), 10, false);

        let response = proxy.handle(request("??", false)).await;
        assert_eq!(response.status, 400);
        assert!(!response.envelope.success);
        assert_eq!(response.envelope.error.as_deref(), Some("INVALID_SYMBOL"));
        assert_eq!(response.envelope.meta.symbol, "??");
        assert_eq!(source.calls(), 0);
        assert!(proxy.cache().is_empty());
        assert_eq!(proxy.limiter().tracked_keys(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_short_circuits_before_cache() {
        let (proxy, source) = proxy(ScriptedSource::new(vec![Ok(json!({}))]), 2, false);

        proxy.handle(request("PTT", false)).await;
        proxy.handle(request("PTT", false)).await;
        let limited = proxy.handle(request("PTT", false)).await;

        assert_eq!(limited.status, 429);
        assert_eq!(limited.envelope.error.as_deref(), Some("RATE_LIMITED"));
        assert!(limited.retry_after_secs.is_some_and(|s| (1..=60).contains(&s)));
        assert_eq!(source.calls(), 1);

        // Another symbol from the same client has its own window.
        let other = proxy.handle(request("AOT", false)).await;
        assert_eq!(other.status, 200);
    }

    #[tokio::test]
    async fn test_upstream_failure_maps_to_envelope_and_is_not_cached() {
        let (proxy, source) = proxy(
            ScriptedSource::new(vec![
                Err(ProxyError::Upstream {
                    status: 502,
                    message: "Failed to fetch stock data from upstream".into(),
                }),
                Ok(json!({"ok": true})),
            ]),
            10,
            false,
        );

        let failed = proxy.handle(request("PTT", false)).await;
        assert_eq!(failed.status, 502);
        assert!(!failed.envelope.success);
        assert!(failed.envelope.data.is_none());
        assert!(proxy.cache().is_empty());

        let recovered = proxy.handle(request("PTT", false)).await;
        assert_eq!(recovered.status, 200);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_verdict_uses_cached_statistics() {
        let stats = json!({"pe": 9.0, "pbv": 1.0, "roe": 16.0, "dividendYield": 5.0});
        let (proxy, source) = proxy(ScriptedSource::new(vec![Ok(stats.clone())]), 10, false);

        let raw = proxy
            .handle(ProxyRequest {
                resource: StockResource::Statistics,
                ..request("PTT", false)
            })
            .await;
        assert_eq!(raw.envelope.data, Some(stats));

        let verdict = proxy
            .handle_verdict("PTT".to_string(), false, "10.0.0.1".to_string())
            .await;
        let verdict_data = verdict.envelope.data.expect("verdict payload");
        assert_eq!(verdict_data.score, 100);
        assert!(verdict.envelope.meta.cached);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_coalesces_concurrent_misses() {
        let source = ScriptedSource::new(vec![Ok(json!({"price": 1}))]).with_delay(Duration::from_millis(100));
        let (proxy, source) = proxy(source, 10, true);

        let (a, b) = tokio::join!(
            proxy.handle(request("PTT", false)),
            proxy.handle(ProxyRequest {
                client_key: "10.0.0.2".to_string(),
                ..request("PTT", false)
            }),
        );

        assert_eq!(a.status, 200);
        assert_eq!(b.status, 200);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_single_flight_concurrent_misses_both_fetch() {
        let source = ScriptedSource::new(vec![Ok(json!({"price": 1}))]).with_delay(Duration::from_millis(100));
        let (proxy, source) = proxy(source, 10, false);

        let (a, b) = tokio::join!(
            proxy.handle(request("PTT", false)),
            proxy.handle(request("PTT", false)),
        );

        assert_eq!((a.status, b.status), (200, 200));
        assert_eq!(source.calls(), 2);
        assert_eq!(proxy.cache().len(), 1);
    }
}

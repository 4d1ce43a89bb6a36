use super::errors::UpstreamError;
use super::retry::RetryPolicy;
use super::throttle::UpstreamThrottle;
use async_trait::async_trait;
use reqwest::{header, Client as ReqwestClient, Url};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::domain::errors::ProxyResult;
use crate::domain::models::{Config, StockResource, Symbol};
use crate::domain::ports::StockDataSource;

/// Configuration for the upstream HTTP client
#[derive(Debug, Clone)]
pub struct UpstreamClientConfig {
    /// Base URL of the upstream API
    pub base_url: String,

    /// Locale path segment
    pub locale: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Retry policy applied to every fetch
    pub retry_policy: RetryPolicy,

    /// Outbound requests per second (0 disables the throttle)
    pub requests_per_second: u32,
}

impl Default for UpstreamClientConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl UpstreamClientConfig {
    /// Derive client settings from the application configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.upstream.base_url.clone(),
            locale: config.upstream.locale.clone(),
            timeout: config.upstream.timeout(),
            retry_policy: RetryPolicy::from_config(&config.retry),
            requests_per_second: config.upstream.requests_per_second,
        }
    }
}

/// `{ success, data }` as returned by the upstream
#[derive(Debug, Deserialize)]
struct UpstreamBody {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the upstream stock-data API
///
/// - Connection pooling via a shared `reqwest::Client`
/// - Per-request timeout, classified as a transient failure
/// - Linear-backoff retries for 5xx, 429, timeouts and network errors
/// - Optional outbound throttle shared across all attempts
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http_client: ReqwestClient,
    base_url: Url,
    locale: String,
    retry_policy: RetryPolicy,
    throttle: Option<UpstreamThrottle>,
}

impl UpstreamClient {
    /// Create a new client
    ///
    /// # Returns
    /// * `Ok(UpstreamClient)` - Client ready to use
    /// * `Err(UpstreamError)` - Base URL invalid or HTTP client could not be built
    pub fn new(config: UpstreamClientConfig) -> Result<Self, UpstreamError> {
        let http_client = ReqwestClient::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .map_err(UpstreamError::Network)?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| UpstreamError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        Ok(Self {
            http_client,
            base_url,
            locale: config.locale,
            retry_policy: config.retry_policy,
            throttle: UpstreamThrottle::per_second(config.requests_per_second),
        })
    }

    /// Full upstream URL for a resource
    pub fn resource_url(&self, symbol: &Symbol, resource: StockResource) -> Result<Url, UpstreamError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let raw = format!(
            "{base}/api/{}/stocks/{}/{}",
            self.locale,
            symbol,
            resource.upstream_path()
        );
        let mut url = Url::parse(&raw).map_err(|e| UpstreamError::InvalidUrl(format!("{raw}: {e}")))?;

        let query = resource.upstream_query();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Fetch one resource, retrying transient failures, and return its `data`
    #[instrument(skip_all, fields(symbol = %symbol, resource = resource.upstream_path()))]
    pub async fn fetch_resource(
        &self,
        symbol: &Symbol,
        resource: StockResource,
    ) -> Result<Value, UpstreamError> {
        let url = self.resource_url(symbol, resource)?;
        self.retry_policy.execute(|| self.send_request(&url)).await
    }

    /// Make one attempt: throttle, send, classify status, parse body
    async fn send_request(&self, url: &Url) -> Result<Value, UpstreamError> {
        if let Some(throttle) = &self.throttle {
            throttle.acquire().await;
        }

        let response = self
            .http_client
            .get(url.clone())
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "upstream returned non-success status");
            return Err(UpstreamError::from_status(status));
        }

        let body: UpstreamBody = response.json().await?;
        if !body.success {
            let reason = body
                .message
                .or(body.error)
                .unwrap_or_else(|| "success=false".to_string());
            return Err(UpstreamError::Rejected(reason));
        }

        body.data
            .ok_or_else(|| UpstreamError::InvalidResponse("missing data field".to_string()))
    }
}

#[async_trait]
impl StockDataSource for UpstreamClient {
    async fn fetch(&self, symbol: &Symbol, resource: StockResource) -> ProxyResult<Value> {
        Ok(self.fetch_resource(symbol, resource).await?)
    }
}

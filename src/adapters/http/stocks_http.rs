//! Stocks HTTP Server.
//!
//! Exposes the cached proxy over HTTP: one thin handler per upstream
//! resource, all funnelled through [`CachedProxy`].

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        ConnectInfo, FromRequestParts, Path, Query, State,
    },
    http::{header, request::Parts, Extensions, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::domain::errors::ProxyError;
use crate::domain::models::{Config, ServerConfig, StockResource};
use crate::domain::ports::StockDataSource;
use crate::infrastructure::upstream::{UpstreamClient, UpstreamClientConfig, UpstreamError};
use crate::services::{CachedProxy, ProxyRequest, ProxyResponse};

/// Proxy over any stock data source, as shared by the handlers.
pub type DynCachedProxy = CachedProxy<dyn StockDataSource>;

/// Methods advertised in CORS preflight responses.
const CORS_ALLOW_METHODS: &str = "GET, OPTIONS";

/// Headers advertised in CORS preflight responses.
const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Preflight cache lifetime in seconds.
const CORS_MAX_AGE: &str = "86400";

/// Query parameters accepted by the stock routes.
#[derive(Debug, Default, Deserialize)]
pub struct StockQueryParams {
    /// `true` or `1` skips the cache read
    #[serde(default)]
    pub nocache: Option<String>,
    /// Valuation look-back in years
    #[serde(default)]
    pub years: Option<String>,
}

impl StockQueryParams {
    fn nocache(&self) -> bool {
        self.nocache
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }
}

/// Everything a stock route reads from the request besides state.
///
/// Undecodable paths and malformed query strings are rejected with the same
/// JSON envelope as any other proxy error.
#[derive(Debug)]
pub struct StockRequest {
    /// Decoded `{symbol}` path segment, not yet validated
    pub symbol: String,
    /// Query parameters
    pub params: StockQueryParams,
    /// Caller identity for rate limiting
    pub client_key: String,
}

impl<S: Send + Sync> FromRequestParts<S> for StockRequest {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let symbol = match Path::<String>::from_request_parts(parts, state).await {
            Ok(Path(symbol)) => symbol,
            Err(rejection) => return Err(path_rejected(parts, &rejection)),
        };
        let params = match Query::<StockQueryParams>::from_request_parts(parts, state).await {
            Ok(Query(params)) => params,
            Err(rejection) => return Err(query_rejected(&symbol, &rejection)),
        };
        let client_key = client_key(&parts.headers, &parts.extensions);

        Ok(Self {
            symbol,
            params,
            client_key,
        })
    }
}

/// Raw, still percent-encoded `{symbol}` segment of a stock route.
fn raw_symbol_segment(parts: &Parts) -> &str {
    parts.uri.path().split('/').nth(3).unwrap_or_default()
}

fn path_rejected(parts: &Parts, rejection: &PathRejection) -> Response {
    let raw = raw_symbol_segment(parts);
    tracing::debug!(symbol = raw, reason = %rejection.body_text(), "rejected undecodable symbol");
    ProxyResponse::<Value>::from_error(raw, &ProxyError::InvalidSymbol(raw.to_string()))
        .into_response()
}

fn query_rejected(symbol: &str, rejection: &QueryRejection) -> Response {
    let err = ProxyError::InvalidParameter {
        name: "query".to_string(),
        reason: rejection.body_text(),
    };
    ProxyResponse::<Value>::from_error(symbol, &err).into_response()
}

/// Shared state for the stocks HTTP server.
#[derive(Clone)]
pub struct AppState {
    proxy: Arc<DynCachedProxy>,
}

impl AppState {
    /// Wrap an already assembled proxy.
    pub fn new(proxy: Arc<DynCachedProxy>) -> Self {
        Self { proxy }
    }

    /// Composition root: upstream client, cache and limiter from configuration.
    pub fn from_config(config: &Config) -> Result<Self, UpstreamError> {
        let client = UpstreamClient::new(UpstreamClientConfig::from_config(config))?;
        let source: Arc<dyn StockDataSource> = Arc::new(client);
        Ok(Self::new(Arc::new(CachedProxy::from_config(source, config))))
    }

    /// The proxy behind the handlers.
    pub fn proxy(&self) -> &Arc<DynCachedProxy> {
        &self.proxy
    }
}

/// Stocks HTTP Server.
pub struct StocksHttpServer {
    config: ServerConfig,
    state: AppState,
}

impl StocksHttpServer {
    /// Create a server for the given state.
    pub fn new(state: AppState, config: ServerConfig) -> Self {
        Self { config, state }
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), self.config.enable_cors)
    }

    /// Start the server.
    pub async fn serve(self) -> anyhow::Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start the server with a shutdown signal.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let router = self.router();

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Stocks HTTP server listening on {}", listener.local_addr()?);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;
        Ok(())
    }
}

/// Build the stock routes around `state`.
pub fn build_router(state: AppState, enable_cors: bool) -> Router {
    let stock_routes: [(&str, axum::routing::MethodRouter<AppState>); 6] = [
        ("/api/stocks/{symbol}/overview", get(get_overview)),
        ("/api/stocks/{symbol}/statistics", get(get_statistics)),
        ("/api/stocks/{symbol}/valuation", get(get_valuation)),
        ("/api/stocks/{symbol}/operations/quarterly", get(get_quarterly_operations)),
        ("/api/stocks/{symbol}/operations/yearly", get(get_yearly_operations)),
        ("/api/stocks/{symbol}/verdict", get(get_verdict)),
    ];

    let mut app = Router::new().route("/health", get(health_check));
    for (path, method_router) in stock_routes {
        let method_router = if enable_cors {
            method_router.options(preflight)
        } else {
            method_router
        };
        app = app.route(path, method_router);
    }

    let app = app.with_state(state).layer(TraceLayer::new_for_http());
    if enable_cors {
        app.layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
    } else {
        app
    }
}

impl<V: serde::Serialize> IntoResponse for ProxyResponse<V> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, axum::Json(self.envelope)).into_response();
        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Identify the caller: first `X-Forwarded-For` hop, `X-Real-IP`, peer address, or `anonymous`.
pub fn client_key(headers: &HeaderMap, extensions: &Extensions) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(ToString::to_string)
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "anonymous".to_string())
}

// Handler functions

async fn health_check() -> &'static str {
    "OK"
}

async fn preflight() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, CORS_ALLOW_METHODS),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, CORS_ALLOW_HEADERS),
            (header::ACCESS_CONTROL_MAX_AGE, CORS_MAX_AGE),
        ],
    )
        .into_response()
}

async fn proxy_resource(
    state: &AppState,
    request: StockRequest,
    resource: StockResource,
) -> ProxyResponse<Value> {
    let nocache = request.params.nocache();
    state
        .proxy
        .handle(ProxyRequest {
            raw_symbol: request.symbol,
            resource,
            nocache,
            client_key: request.client_key,
        })
        .await
}

async fn get_overview(State(state): State<AppState>, request: StockRequest) -> ProxyResponse<Value> {
    proxy_resource(&state, request, StockResource::Overview).await
}

async fn get_statistics(State(state): State<AppState>, request: StockRequest) -> ProxyResponse<Value> {
    proxy_resource(&state, request, StockResource::Statistics).await
}

async fn get_valuation(State(state): State<AppState>, request: StockRequest) -> ProxyResponse<Value> {
    match StockResource::valuation_from_query(request.params.years.as_deref()) {
        Ok(resource) => proxy_resource(&state, request, resource).await,
        Err(err) => ProxyResponse::from_error(&request.symbol, &err),
    }
}

async fn get_quarterly_operations(
    State(state): State<AppState>,
    request: StockRequest,
) -> ProxyResponse<Value> {
    proxy_resource(&state, request, StockResource::QuarterlyOperations).await
}

async fn get_yearly_operations(
    State(state): State<AppState>,
    request: StockRequest,
) -> ProxyResponse<Value> {
    proxy_resource(&state, request, StockResource::YearlyOperations).await
}

async fn get_verdict(State(state): State<AppState>, request: StockRequest) -> Response {
    let nocache = request.params.nocache();
    state
        .proxy
        .handle_verdict(request.symbol, nocache, request.client_key)
        .await
        .into_response()
}

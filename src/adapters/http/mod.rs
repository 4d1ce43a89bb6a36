//! HTTP adapter
//!
//! Axum routes for the stock proxy. Handlers only extract path, query and
//! caller identity; the pipeline lives in [`crate::services::CachedProxy`].

pub mod stocks_http;

pub use stocks_http::{build_router, client_key, AppState, StockRequest, StocksHttpServer};

//! fonpick - cached proxy for Thai stock market data
//!
//! Sits between a dashboard front end and the upstream stock-data API. Every
//! request is validated, rate limited per caller, served from a bounded TTL
//! cache when possible, and otherwise fetched upstream with bounded retries.
//! Responses are wrapped in a uniform JSON envelope.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Symbols, resources, envelopes, verdict scoring, errors
//! - **Service Layer** (`services`): The generic cached proxy pipeline and single-flight
//! - **Infrastructure Layer** (`infrastructure`): Cache, rate limiter, upstream client, config, logging
//! - **Adapters** (`adapters`): Axum HTTP routes
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use fonpick::adapters::http::{AppState, StocksHttpServer};
//! use fonpick::infrastructure::config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let state = AppState::from_config(&config)?;
//!     StocksHttpServer::new(state, config.server).serve().await
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{ProxyError, ProxyResult};
pub use domain::models::{
    CacheConfig, Config, ProxyEnvelope, RateLimitConfig, RetryConfig, StockResource, Symbol,
    Verdict,
};
pub use domain::ports::StockDataSource;
pub use infrastructure::cache::BoundedCache;
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::rate_limit::FixedWindowRateLimiter;
pub use infrastructure::upstream::{RetryPolicy, UpstreamClient, UpstreamError};
pub use services::{CachedProxy, SingleFlight};

//! Upstream stock-data API integration
//!
//! - `client`: reqwest-based HTTP client implementing `StockDataSource`
//! - `errors`: status classification into transient and permanent failures
//! - `retry`: linear-backoff retry policy
//! - `throttle`: optional outbound requests-per-second cap

pub mod client;
pub mod errors;
pub mod retry;
pub mod throttle;

pub use client::{UpstreamClient, UpstreamClientConfig};
pub use errors::UpstreamError;
pub use retry::RetryPolicy;
pub use throttle::UpstreamThrottle;

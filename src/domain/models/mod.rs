pub mod config;
pub mod envelope;
pub mod stock;
pub mod verdict;

pub use config::{
    CacheConfig, Config, LogFormat, LoggingConfig, ProxyConfig, RateLimitConfig, RetryConfig,
    RotationPolicy, ServerConfig, UpstreamConfig,
};
pub use envelope::{EnvelopeMeta, ProxyEnvelope};
pub use stock::{StockResource, Symbol};
pub use verdict::{evaluate, Fundamentals, Verdict, VerdictLabel};

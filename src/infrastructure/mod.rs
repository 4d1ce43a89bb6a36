//! Infrastructure layer module
//!
//! This module contains the infrastructure the proxy is assembled from:
//! - Bounded TTL cache
//! - Fixed-window rate limiter
//! - Upstream HTTP client with retry and throttling
//! - Configuration management
//! - Logging infrastructure
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod cache;
pub mod config;
pub mod logging;
pub mod rate_limit;
pub mod upstream;

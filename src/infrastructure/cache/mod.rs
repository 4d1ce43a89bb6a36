//! In-memory caching for upstream responses.
//!
//! A bounded, TTL-expiring map with insertion-order eviction, explicitly
//! constructed from `CacheConfig` and injected into the proxy service.

pub mod bounded_cache;

pub use bounded_cache::{BoundedCache, CacheEntry};

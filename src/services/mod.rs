//! Service layer: the cached proxy pipeline and its helpers.

pub mod cached_proxy;
pub mod single_flight;

pub use cached_proxy::{CachedPayload, CachedProxy, ProxyRequest, ProxyResponse};
pub use single_flight::SingleFlight;

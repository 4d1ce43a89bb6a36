//! Domain layer for the stock-data proxy
//!
//! Pure models (symbols, resources, envelopes, verdict scoring), the
//! proxy error taxonomy, and the ports implemented by infrastructure.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{ProxyError, ProxyResult};

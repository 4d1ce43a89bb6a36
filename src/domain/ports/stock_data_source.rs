use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::ProxyResult;
use crate::domain::models::{StockResource, Symbol};

/// Source of per-symbol stock data.
///
/// The production implementation is the retrying upstream HTTP client;
/// tests substitute in-memory fakes. Implementations return only the
/// `data` part of the upstream response and must already have mapped
/// transport failures into [`ProxyError`](crate::domain::errors::ProxyError).
#[async_trait]
pub trait StockDataSource: Send + Sync {
    /// Fetch one resource for one symbol.
    async fn fetch(&self, symbol: &Symbol, resource: StockResource) -> ProxyResult<Value>;
}

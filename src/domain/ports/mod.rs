//! Port trait definitions (Hexagonal Architecture)
//!
//! Infrastructure adapters implement these traits so the proxy service
//! can be exercised without network access.

pub mod stock_data_source;

pub use stock_data_source::StockDataSource;

//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading (`fonpick.yaml`, `fonpick.local.yaml`)
//! - Environment variable overrides (`FONPICK_*`)
//! - Configuration validation

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};

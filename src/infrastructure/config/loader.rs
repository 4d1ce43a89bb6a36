use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use reqwest::Url;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project config file, read from the working directory
pub const CONFIG_FILE: &str = "fonpick.yaml";

/// Local overrides, read after [`CONFIG_FILE`]
pub const LOCAL_CONFIG_FILE: &str = "fonpick.local.yaml";

/// Prefix for environment overrides (`FONPICK_CACHE__TTL_SECS=60`)
pub const ENV_PREFIX: &str = "FONPICK_";

/// Configuration error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `cache.capacity` is zero
    #[error("Invalid cache capacity: {0}. Must be at least 1")]
    InvalidCacheCapacity(usize),

    /// `cache.ttl_secs` is zero
    #[error("Invalid cache ttl_secs: {0}. Must be positive")]
    InvalidCacheTtl(u64),

    /// `rate_limit.window_secs` is zero
    #[error("Invalid rate limit window_secs: {0}. Must be positive")]
    InvalidRateLimitWindow(u64),

    /// `rate_limit.max_requests` is zero
    #[error("Invalid rate limit max_requests: {0}. Must be at least 1")]
    InvalidMaxRequests(u32),

    /// `upstream.timeout_secs` is zero
    #[error("Invalid upstream timeout_secs: {0}. Must be positive")]
    InvalidTimeout(u64),

    /// `upstream.base_url` is blank
    #[error("Upstream base_url cannot be empty")]
    EmptyBaseUrl,

    /// `upstream.base_url` does not parse as a URL
    #[error("Invalid upstream base_url '{0}': {1}")]
    InvalidBaseUrl(String, String),

    /// `logging.level` is not a known level
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. fonpick.yaml (optional)
    /// 3. fonpick.local.yaml (optional)
    /// 4. Environment variables (FONPICK_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(CONFIG_FILE))
            .merge(Yaml::file(LOCAL_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file in place of the default files.
    ///
    /// Environment variables still override the file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context(format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// [`Self::load_from_file`] when a path is given, otherwise [`Self::load`]
    pub fn load_optional(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load(),
        }
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.cache.capacity == 0 {
            return Err(ConfigError::InvalidCacheCapacity(config.cache.capacity));
        }
        if config.cache.ttl_secs == 0 {
            return Err(ConfigError::InvalidCacheTtl(config.cache.ttl_secs));
        }

        if config.rate_limit.window_secs == 0 {
            return Err(ConfigError::InvalidRateLimitWindow(
                config.rate_limit.window_secs,
            ));
        }
        if config.rate_limit.max_requests == 0 {
            return Err(ConfigError::InvalidMaxRequests(
                config.rate_limit.max_requests,
            ));
        }

        if config.upstream.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(config.upstream.timeout_secs));
        }
        let base_url = config.upstream.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidBaseUrl(base_url.to_string(), e.to_string()))?;

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::{LogFormat, RotationPolicy};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cache.capacity, 100);
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.rate_limit.max_requests, 60);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.upstream.timeout_secs, 10);
        assert!(!config.proxy.single_flight);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
server:
  port: 9090
upstream:
  base_url: https://data.example.com
  locale: th
cache:
  capacity: 500
  ttl_secs: 60
proxy:
  single_flight: true
logging:
  level: debug
  format: pretty
  rotation: hourly
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.upstream.locale, "th");
        assert_eq!(config.cache.capacity, 500);
        assert_eq!(config.cache.ttl_secs, 60);
        assert!(config.proxy.single_flight);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.rotation, RotationPolicy::Hourly);
        assert_eq!(config.retry.base_delay_ms, 500, "unset fields keep defaults");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_capacity() {
        let mut config = Config::default();
        config.cache.capacity = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidCacheCapacity(0))
        );
    }

    #[test]
    fn test_validate_zero_ttl() {
        let mut config = Config::default();
        config.cache.ttl_secs = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidCacheTtl(0))
        );
    }

    #[test]
    fn test_validate_zero_window_and_requests() {
        let mut config = Config::default();
        config.rate_limit.window_secs = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRateLimitWindow(0))
        );

        let mut config = Config::default();
        config.rate_limit.max_requests = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxRequests(0))
        );
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.upstream.timeout_secs = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidTimeout(0))
        );
    }

    #[test]
    fn test_validate_base_url() {
        let mut config = Config::default();
        config.upstream.base_url = "  ".to_string();
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyBaseUrl)
        );

        config.upstream.base_url = "not a url".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBaseUrl(url, _)) if url == "not a url"
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "verbose"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "cache:\n  capacity: 7\nrate_limit:\n  max_requests: 3\n  window_secs: 10"
        )
        .unwrap();
        file.flush().unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.cache.capacity, 7);
        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.rate_limit.window_secs, 10);
        assert_eq!(config.cache.ttl_secs, 300);
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "cache:\n  capacity: 0").unwrap();
        file.flush().unwrap();

        let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigLoader::load_from_file(dir.path().join("absent.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "cache:\n  capacity: 50\n  ttl_secs: 120\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "cache:\n  capacity: 200\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.cache.capacity, 200, "Override should win");
        assert_eq!(config.cache.ttl_secs, 120, "Base value should persist");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_env_override() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FONPICK_SERVER__PORT", "3000");
            jail.set_env("FONPICK_UPSTREAM__LOCALE", "th");
            jail.create_file(CONFIG_FILE, "server:\n  port: 9000\n  host: 0.0.0.0")?;
            jail.create_file(LOCAL_CONFIG_FILE, "server:\n  host: 127.0.0.2")?;

            let config = ConfigLoader::load().map_err(|e| e.to_string())?;
            assert_eq!(config.server.port, 3000, "environment beats files");
            assert_eq!(config.server.host, "127.0.0.2", "local file beats project file");
            assert_eq!(config.upstream.locale, "th");
            Ok(())
        });
    }
}

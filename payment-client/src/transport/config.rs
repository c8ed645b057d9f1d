//! Transport configuration types.
//!
//! TOML-deserializable settings for the reqwest-backed transport.

use std::time::Duration;

use serde::Deserialize;

use crate::config::ConfigError;

/// HTTP transport configuration.
///
/// # Examples
///
/// ```toml
/// [http]
/// timeout_ms = 10000
/// connect_timeout_ms = 5000
/// pool_max_idle_per_host = 10
/// http_version = "http1"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Total request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Maximum idle connections per host.
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,

    /// HTTP version preference.
    #[serde(default)]
    pub http_version: HttpVersion,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            pool_max_idle_per_host: default_pool_max_idle(),
            http_version: HttpVersion::default(),
        }
    }
}

impl HttpConfig {
    /// Validates configuration values are within acceptable bounds.
    ///
    /// # Errors
    ///
    /// Returns error if timeout values are outside valid ranges:
    /// - `timeout_ms`: must be 1-300000 milliseconds
    /// - `connect_timeout_ms`: must be 1-60000 milliseconds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 || self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid("timeout_ms must be between 1 and 300000".to_owned()));
        }
        if self.connect_timeout_ms == 0 || self.connect_timeout_ms > 60_000 {
            return Err(ConfigError::Invalid(
                "connect_timeout_ms must be between 1 and 60000".to_owned(),
            ));
        }
        Ok(())
    }

    /// Returns timeout as Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns connect timeout as Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// HTTP version preference.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HttpVersion {
    /// HTTP/1.1 only.
    Http1,
    /// HTTP/2 only (requires prior knowledge).
    Http2,
    /// Let the connection negotiate.
    #[default]
    Auto,
}

const fn default_timeout_ms() -> u64 {
    10_000
}

const fn default_connect_timeout_ms() -> u64 {
    5_000
}

const fn default_pool_max_idle() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_default() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.connect_timeout_ms, 5_000);
        assert_eq!(config.pool_max_idle_per_host, 10);
        assert_eq!(config.http_version, HttpVersion::Auto);
    }

    #[test]
    fn test_http_config_durations() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_http_config_from_toml() {
        let toml = "
            timeout_ms = 2500
            connect_timeout_ms = 1000
            pool_max_idle_per_host = 4
            http_version = \"http1\"
        ";

        let config: HttpConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.timeout_ms, 2500);
        assert_eq!(config.connect_timeout_ms, 1000);
        assert_eq!(config.pool_max_idle_per_host, 4);
        assert_eq!(config.http_version, HttpVersion::Http1);
    }

    #[test]
    fn test_http_config_partial_toml_uses_defaults() {
        let config: HttpConfig = toml::from_str("timeout_ms = 20000").unwrap();
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.connect_timeout_ms, 5_000);
    }

    #[test]
    fn test_http_config_validate_bounds() {
        assert!(HttpConfig::default().validate().is_ok());

        let zero = HttpConfig { timeout_ms: 0, ..HttpConfig::default() };
        assert!(zero.validate().is_err());

        let huge = HttpConfig { timeout_ms: 300_001, ..HttpConfig::default() };
        assert!(huge.validate().is_err());

        let connect = HttpConfig { connect_timeout_ms: 0, ..HttpConfig::default() };
        assert!(connect.validate().is_err());
    }
}

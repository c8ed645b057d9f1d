//! Client configuration.
//!
//! A [`ClientConfig`] is read from TOML, optionally adjusted from the
//! environment, and validated once before any client is built.
//!
//! # Examples
//!
//! ```
//! use payment_client::config::ClientConfig;
//!
//! let config = ClientConfig::from_toml(
//!     r#"
//!     base_url = "http://localhost:5000"
//!
//!     [http]
//!     timeout_ms = 10000
//!
//!     [retry]
//!     max_attempts = 3
//!     delay_ms = 1000
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.http.timeout_ms, 10_000);
//! ```

use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::{reliability::RetryPolicy, transport::HttpConfig};

/// Default backend endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Environment variable overriding [`ClientConfig::base_url`].
pub const BASE_URL_ENV: &str = "PAYMENT_API_BASE_URL";

/// Environment variable overriding [`HttpConfig::timeout_ms`].
pub const TIMEOUT_ENV: &str = "PAYMENT_API_TIMEOUT_MS";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range or malformed.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The configuration file could not be read.
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for this schema.
    #[error("invalid TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The HTTP client could not be constructed.
    #[error("cannot build HTTP client: {0}")]
    Client(String),
}

/// Root client configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the payment backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Extra headers sent with every request. `Content-Type:
    /// application/json` is always sent unless overridden here.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Transport settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Retry settings for payment creation.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Last-transaction cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Whether operations emit notifications by default.
    #[serde(default = "default_true")]
    pub show_toast: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            headers: BTreeMap::new(),
            http: HttpConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            show_toast: true,
        }
    }
}

impl ClientConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns error if TOML parsing fails or configuration validation fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is invalid.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Applies [`BASE_URL_ENV`] and [`TIMEOUT_ENV`] from the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns error if an override is malformed or the result is invalid.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns error if an override is malformed or the result is invalid.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|value| !value.trim().is_empty()) {
            self.base_url = base_url.trim().to_owned();
        }
        if let Some(timeout) = lookup(TIMEOUT_ENV) {
            self.http.timeout_ms = timeout.trim().parse().map_err(|e| {
                ConfigError::Invalid(format!("{TIMEOUT_ENV} must be a number of milliseconds: {e}"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validates the configuration.
    ///
    /// This method checks for:
    /// - Base URL parses and uses `http` or `https`
    /// - Transport timeouts are within bounds
    /// - Header names and values contain no control characters
    /// - Retry settings allow at least one attempt
    ///
    /// Plain `http` is accepted: the default backend is a local endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            ConfigError::Invalid(format!("invalid base_url '{}': {e}", self.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "base_url must use http or https, got: {}",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(ConfigError::Invalid(format!("base_url has no host: {}", self.base_url)));
        }

        self.http.validate()?;

        for (name, value) in &self.headers {
            crate::transport::http::validate_header(name, value).map_err(ConfigError::Invalid)?;
        }

        self.retry.validate()
    }

    /// Returns the headers attached to every request.
    #[must_use]
    pub fn effective_headers(&self) -> Vec<(String, String)> {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_owned(), "application/json".to_owned());
        for (name, value) in &self.headers {
            headers.retain(|existing: &String, _| !existing.eq_ignore_ascii_case(name));
            headers.insert(name.clone(), value.clone());
        }
        headers.into_iter().collect()
    }
}

/// Retry settings for payment creation.
///
/// Defaults to three attempts with a fixed one-second delay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Upper bound for any delay, in milliseconds. Defaults to `delay_ms`.
    #[serde(default)]
    pub max_delay_ms: Option<u64>,

    /// Growth factor between delays; `1.0` keeps the delay fixed.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
            max_delay_ms: None,
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Validates retry settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for zero attempts, a maximum delay
    /// below the initial delay, or a multiplier below 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".to_owned()));
        }
        if self.max_delay_ms() < self.delay_ms {
            return Err(ConfigError::Invalid(
                "retry.max_delay_ms must not be below retry.delay_ms".to_owned(),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "retry.backoff_multiplier must be a finite number >= 1.0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Returns the delay cap, falling back to `delay_ms` when unset.
    #[must_use]
    pub fn max_delay_ms(&self) -> u64 {
        self.max_delay_ms.unwrap_or(self.delay_ms)
    }

    /// Converts the settings into a [`RetryPolicy`].
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms()),
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}

/// Last-transaction cache settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Directory holding the persisted record. When absent the cache lives
    /// in memory only.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

const fn default_true() -> bool {
    true
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_delay_ms() -> u64 {
    1_000
}

const fn default_backoff_multiplier() -> f64 {
    1.0
}

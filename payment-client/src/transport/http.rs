//! HTTP transport implementation.
//!
//! This module provides HTTP/1.1 and HTTP/2 transport using reqwest.

use std::error::Error as StdError;

use reqwest::Client;
use tracing::instrument;

use super::config::{HttpConfig, HttpVersion};
use crate::{
    config::ConfigError,
    error::ErrorCode,
    transport::{HttpRequest, HttpResponse, Method, Transport, TransportError},
};

/// Validates header name and value for CRLF injection prevention.
pub(crate) fn validate_header(name: &str, value: &str) -> Result<(), String> {
    if name.is_empty() || name.contains(['\r', '\n', '\0', ':']) {
        return Err(format!("invalid header name: {name:?}"));
    }
    if value.contains(['\r', '\n', '\0']) {
        return Err(format!("invalid header value for {name}"));
    }
    Ok(())
}

/// HTTP/1.1 and HTTP/2 transport using reqwest.
///
/// Supports connection pooling and keep-alive. Timeouts surface as
/// [`ErrorCode::ConnectionAborted`].
///
/// # Examples
///
/// ```
/// use payment_client::transport::{HttpConfig, HttpTransport};
///
/// let transport = HttpTransport::with_config(&HttpConfig::default()).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout_ms: u64,
}

impl HttpTransport {
    /// Creates HTTP transport with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is out of bounds or the HTTP
    /// client cannot be built.
    pub fn with_config(config: &HttpConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut builder = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout());

        builder = match config.http_version {
            HttpVersion::Http1 => builder.http1_only(),
            HttpVersion::Http2 => builder.http2_prior_knowledge(),
            HttpVersion::Auto => builder,
        };

        let client = builder.build().map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self { client, timeout_ms: config.timeout_ms })
    }

    /// Maps a reqwest failure onto the transport taxonomy.
    fn classify(&self, error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            return TransportError::new(
                ErrorCode::ConnectionAborted,
                format!("timeout of {}ms exceeded", self.timeout_ms),
            );
        }

        let code = if error.is_connect() {
            connect_failure_code(error)
        } else {
            ErrorCode::Network
        };

        TransportError::new(code, format!("{}: {}", code.as_str(), root_cause(error)))
    }
}

/// Walks the source chain to tell refused connections from DNS failures.
fn connect_failure_code(error: &reqwest::Error) -> ErrorCode {
    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => return ErrorCode::ConnectionRefused,
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::ConnectionAborted => {
                    return ErrorCode::ConnectionAborted;
                }
                _ => {}
            }
        }
        let text = cause.to_string().to_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return ErrorCode::HostNotFound;
        }
        source = cause.source();
    }
    ErrorCode::Network
}

fn root_cause(error: &reqwest::Error) -> String {
    let mut current: &dyn StdError = error;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}

impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };

        for (name, value) in &request.headers {
            validate_header(name, value)
                .map_err(|message| TransportError::new(ErrorCode::BadRequest, message))?;
            builder = builder.header(name, value);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| self.classify(&e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.classify(&e))?.to_vec();

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_owned(),
            body,
        })
    }
}

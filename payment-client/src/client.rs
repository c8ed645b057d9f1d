//! HTTP client wrapper.
//!
//! [`ApiClient`] binds a [`Transport`] to a base URL and default headers.
//! Every request goes through one logging hook on the way out, and every
//! answer that is not a decodable 2xx goes through one normalization hook
//! that produces a [`RequestFailure`]. Nothing is retried here.
//!
//! # Examples
//!
//! ```rust,no_run
//! use payment_client::{client::ApiClient, config::ClientConfig, models::Transaction};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new(&ClientConfig::default())?;
//! let transactions: Vec<Transaction> = client.get("/api/payments").await?;
//! println!("{} transactions", transactions.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use tracing::{Span, error, info, instrument};
use uuid::Uuid;

use crate::{
    config::{ClientConfig, ConfigError},
    error::{ApiError, ErrorCode},
    transport::{HttpRequest, HttpResponse, HttpTransport, Method, Transport, TransportError},
};

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Response details attached to a failure when the backend answered.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase.
    pub status_text: String,
    /// Response body: parsed JSON, raw text, or `None` when empty.
    pub data: Option<Value>,
}

/// Normalized failure of a single request.
///
/// Produced for transport failures, non-2xx answers and undecodable 2xx
/// bodies alike. The resource layer turns it into an
/// [`ApiError`](crate::error::ApiError).
#[must_use = "errors should be handled, propagated, or explicitly ignored"]
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct RequestFailure {
    /// Transport message, or `Request failed with status code N`.
    pub message: String,
    /// Failure classification.
    pub code: ErrorCode,
    /// Present when the backend answered.
    pub response: Option<FailedResponse>,
    /// Method of the failed request.
    pub method: Method,
    /// Absolute URL of the failed request.
    pub url: String,
}

impl RequestFailure {
    /// Returns the HTTP status, when the backend answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|response| response.status)
    }

    /// Returns the response body, when there was one.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.response.as_ref().and_then(|response| response.data.as_ref())
    }

    /// Returns a non-empty string field of a JSON object body.
    ///
    /// # Examples
    ///
    /// ```
    /// use payment_client::{
    ///     client::{FailedResponse, RequestFailure},
    ///     error::ErrorCode,
    ///     transport::Method,
    /// };
    /// use serde_json::json;
    ///
    /// let failure = RequestFailure {
    ///     message: "Request failed with status code 402".to_owned(),
    ///     code: ErrorCode::BadRequest,
    ///     response: Some(FailedResponse {
    ///         status: 402,
    ///         status_text: "Payment Required".to_owned(),
    ///         data: Some(json!({ "message": "Card declined", "error": "" })),
    ///     }),
    ///     method: Method::Post,
    ///     url: "http://localhost:5000/api/payments".to_owned(),
    /// };
    ///
    /// assert_eq!(failure.data_str("message"), Some("Card declined"));
    /// assert_eq!(failure.data_str("error"), None);
    /// ```
    #[must_use]
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data()
            .and_then(|data| data.get(key))
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Converts into an [`ApiError`] with the given message, keeping the
    /// code, status and body.
    pub fn into_api_error(self, message: impl Into<String>) -> ApiError {
        let mut error = ApiError::new(message).with_code(self.code);
        if let Some(response) = self.response {
            error = error.with_status(response.status);
            if let Some(data) = response.data {
                error = error.with_details(data);
            }
        }
        error
    }
}

/// HTTP client wrapper bound to one backend.
///
/// Cloning is cheap: clones share the transport.
#[derive(Debug)]
pub struct ApiClient<T = HttpTransport> {
    transport: Arc<T>,
    base_url: String,
    headers: Vec<(String, String)>,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            base_url: self.base_url.clone(),
            headers: self.headers.clone(),
        }
    }
}

impl ApiClient<HttpTransport> {
    /// Creates a client backed by [`HttpTransport`].
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let transport = HttpTransport::with_config(&config.http)?;
        Self::with_transport(transport, config)
    }
}

impl<T: Transport> ApiClient<T> {
    /// Creates a client over a caller-supplied transport.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid.
    pub fn with_transport(transport: T, config: &ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            transport: Arc::new(transport),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            headers: config.effective_headers(),
        })
    }

    /// Returns the base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `GET {base_url}{path}` and decodes the JSON answer.
    ///
    /// # Errors
    ///
    /// Returns [`RequestFailure`] on transport failure, non-2xx status or
    /// undecodable body.
    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, RequestFailure> {
        self.request(Method::Get, path, None).await
    }

    /// Sends `POST {base_url}{path}` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`RequestFailure`] on encoding failure, transport failure,
    /// non-2xx status or undecodable body.
    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, RequestFailure>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = self.encode(Method::Post, path, body)?;
        self.request(Method::Post, path, Some(body)).await
    }

    /// Sends `PUT {base_url}{path}` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`RequestFailure`] on encoding failure, transport failure,
    /// non-2xx status or undecodable body.
    pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R, RequestFailure>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = self.encode(Method::Put, path, body)?;
        self.request(Method::Put, path, Some(body)).await
    }

    /// Sends `DELETE {base_url}{path}`.
    ///
    /// An empty body decodes as JSON `null`, so `R = ()` or
    /// `R = Option<_>` accept bodiless answers.
    ///
    /// # Errors
    ///
    /// Returns [`RequestFailure`] on transport failure, non-2xx status or
    /// undecodable body.
    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R, RequestFailure> {
        self.request(Method::Delete, path, None).await
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn encode<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Vec<u8>, RequestFailure> {
        serde_json::to_vec(body).map_err(|e| {
            self.normalize(
                method,
                self.url_for(path),
                ErrorCode::BadRequest,
                format!("request body serialization failed: {e}"),
                None,
            )
        })
    }

    #[instrument(skip(self, body), fields(request_id))]
    async fn request<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<R, RequestFailure> {
        let url = self.url_for(path);
        if let Err(message) = validate_path(path) {
            return Err(self.normalize(method, url, ErrorCode::BadRequest, message, None));
        }

        let request_id = Uuid::new_v4();
        Span::current().record("request_id", tracing::field::display(request_id));
        info!("Making {method} request to {url}");

        let mut request = HttpRequest::new(method, &url);
        for (name, value) in &self.headers {
            request = request.with_header(name, value);
        }
        request = request.with_header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(body) = body {
            request = request.with_body(body);
        }

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(TransportError { message, code }) => {
                return Err(self.normalize(method, url, code, message, None));
            }
        };

        if !response.is_success() {
            let message = format!("Request failed with status code {}", response.status);
            let code = ErrorCode::for_status(response.status);
            return Err(self.normalize(method, url, code, message, Some(failed_response(response))));
        }

        decode(&response.body).map_err(|e| {
            let message = format!("invalid response body: {e}");
            self.normalize(
                method,
                url,
                ErrorCode::BadResponse,
                message,
                Some(failed_response(response)),
            )
        })
    }

    /// The single point where failures are shaped and logged.
    fn normalize(
        &self,
        method: Method,
        url: String,
        code: ErrorCode,
        message: String,
        response: Option<FailedResponse>,
    ) -> RequestFailure {
        let failure = RequestFailure { message, code, response, method, url };
        error!(
            message = %failure.message,
            code = %failure.code,
            status = failure.status(),
            status_text = failure.response.as_ref().map(|r| r.status_text.as_str()),
            data = ?failure.data(),
            url = %failure.url,
            method = %failure.method,
            "API Error"
        );
        failure
    }
}

fn decode<R: DeserializeOwned>(body: &[u8]) -> Result<R, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_slice(body)
    }
}

fn failed_response(response: HttpResponse) -> FailedResponse {
    let data = if response.body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(serde_json::from_slice(&response.body).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&response.body).into_owned())
        }))
    };
    FailedResponse { status: response.status, status_text: response.status_text, data }
}

/// Validates a request path relative to the base URL.
fn validate_path(path: &str) -> Result<(), String> {
    if !path.starts_with('/') {
        return Err(format!("request path must start with '/': {path}"));
    }
    if path.chars().any(char::is_control) {
        return Err("request path contains control characters".to_owned());
    }
    if path.split(['/', '?', '#']).any(|segment| segment == "..") {
        return Err(format!("request path must not contain '..': {path}"));
    }
    Ok(())
}

/// Builds `{endpoint}/{id}` after checking that `id` is a single path
/// segment.
///
/// # Errors
///
/// Returns a description of the problem when `id` is empty or contains
/// whitespace, `/`, `?` or `#`.
pub fn resource_path(endpoint: &str, id: &str) -> Result<String, String> {
    if id.is_empty() {
        return Err("id must not be empty".to_owned());
    }
    if id.chars().any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '?' | '#'))
        || id == "."
        || id == ".."
    {
        return Err(format!("invalid id: {id:?}"));
    }
    Ok(format!("{}/{id}", endpoint.trim_end_matches('/')))
}

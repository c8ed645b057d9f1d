//! Error types for the payment gateway client.
//!
//! Every operation that talks to the payment backend resolves to either a
//! domain value or an [`ApiError`]. Transport exceptions never escape the
//! client: they are folded into the same shape, with the transport
//! [`ErrorCode`] preserved so that higher layers can decide whether a retry
//! makes sense.
//!
//! # Error Categories
//!
//! - **Network errors** ([`ErrorCode::ConnectionRefused`], [`ErrorCode::HostNotFound`],
//!   [`ErrorCode::ConnectionAborted`], [`ErrorCode::Network`]): no response reached the client
//! - **HTTP errors** ([`ErrorCode::BadRequest`], [`ErrorCode::BadResponse`]): the backend answered
//!   with a 4xx/5xx status or an undecodable body
//! - **Validation errors**: a request failed local format checks and was never sent
//!
//! # Examples
//!
//! ```
//! use payment_client::error::{ApiError, ErrorCode};
//!
//! let error = ApiError::new("Transaction not found").with_status(404);
//! assert!(error.is_not_found());
//!
//! let error = ApiError::new("connect ECONNREFUSED").with_code(ErrorCode::ConnectionRefused);
//! assert!(error.is_retryable());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Result type alias for client operations.
///
/// All fallible backend operations in this crate return this type.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Transport-level classification of a failure.
///
/// The serialized names follow the codes commonly reported by HTTP client
/// libraries, so logs and persisted error details stay recognizable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The backend actively refused the connection.
    #[serde(rename = "ECONNREFUSED")]
    ConnectionRefused,
    /// The backend host name could not be resolved.
    #[serde(rename = "ENOTFOUND")]
    HostNotFound,
    /// The request timed out or was aborted on the client side.
    #[serde(rename = "ECONNABORTED")]
    ConnectionAborted,
    /// Any other failure before a response arrived (TLS, reset, protocol).
    #[serde(rename = "ERR_NETWORK")]
    Network,
    /// The backend answered with a 4xx status, or the request could not be built.
    #[serde(rename = "ERR_BAD_REQUEST")]
    BadRequest,
    /// The backend answered with a 5xx status or a body that could not be decoded.
    #[serde(rename = "ERR_BAD_RESPONSE")]
    BadResponse,
}

impl ErrorCode {
    /// Returns the wire name of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionRefused => "ECONNREFUSED",
            Self::HostNotFound => "ENOTFOUND",
            Self::ConnectionAborted => "ECONNABORTED",
            Self::Network => "ERR_NETWORK",
            Self::BadRequest => "ERR_BAD_REQUEST",
            Self::BadResponse => "ERR_BAD_RESPONSE",
        }
    }

    /// Returns `true` for the codes eligible for automatic retry.
    ///
    /// Only connection refused, host not found and client-side abort/timeout
    /// qualify. Errors where the backend produced a response never do.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::ConnectionRefused | Self::HostNotFound | Self::ConnectionAborted)
    }

    /// Returns `true` when no response reached the client.
    #[must_use]
    pub const fn is_network(self) -> bool {
        self.is_retryable() || matches!(self, Self::Network)
    }

    /// Picks the code for a completed response with a non-success status.
    #[must_use]
    pub const fn for_status(status: u16) -> Self {
        if status >= 500 { Self::BadResponse } else { Self::BadRequest }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How alarming an error is for the person looking at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Expected or user-correctable outcome.
    Low,
    /// The backend rejected the request.
    Medium,
    /// The backend failed or could not be reached.
    High,
}

/// Normalized failure of a backend operation.
///
/// Constructed uniformly from network failures, timeouts and non-2xx
/// responses, so callers only ever see this shape.
///
/// # Fields
///
/// - `message`: human-readable, never empty for errors built by this crate
/// - `status`: HTTP status when the backend answered
/// - `details`: the backend's JSON error body, or validation context
/// - `code`: transport classification, absent for local validation failures
///
/// This type implements `#[must_use]` to ensure errors are not silently ignored.
#[must_use = "errors should be handled, propagated, or explicitly ignored"]
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    /// Human-readable description of the failure.
    pub message: String,
    /// HTTP status code, when a response was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Structured details, usually the backend's error body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Transport classification of the failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl ApiError {
    /// Creates an error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), status: None, details: None, code: None }
    }

    /// Creates the error reported when a request fails local format checks.
    ///
    /// `field` is the wire name of the offending field.
    ///
    /// # Examples
    ///
    /// ```
    /// use payment_client::error::ApiError;
    ///
    /// let error = ApiError::validation("cvv", "CVV must be 3 or 4 digits");
    /// assert_eq!(error.to_string(), "CVV must be 3 or 4 digits");
    /// assert!(error.is_validation());
    /// ```
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::new(message).with_details(serde_json::json!({ "field": field }))
    }

    /// Attaches an HTTP status.
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches structured details.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attaches a transport code.
    pub const fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Returns `true` if the backend reported 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    /// Returns `true` if the error came from local validation.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.code.is_none()
            && self.status.is_none()
            && self.details.as_ref().is_some_and(|details| details.get("field").is_some())
    }

    /// Returns `true` if an automatic retry may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.code.is_some_and(ErrorCode::is_retryable)
    }

    /// Returns `true` if the failure happened before any response arrived.
    ///
    /// Besides the transport code, messages mentioning a timeout or a generic
    /// network error are treated as network failures.
    #[must_use]
    pub fn is_network_error(&self) -> bool {
        self.code.is_some_and(ErrorCode::is_network)
            || self.message.contains("timeout")
            || self.message.contains("Network Error")
    }

    /// Classifies how severe the error is.
    ///
    /// # Examples
    ///
    /// ```
    /// use payment_client::error::{ApiError, Severity};
    ///
    /// assert_eq!(ApiError::new("boom").with_status(502).severity(), Severity::High);
    /// assert_eq!(ApiError::new("nope").with_status(422).severity(), Severity::Medium);
    /// assert_eq!(ApiError::new("odd").severity(), Severity::Low);
    /// ```
    pub fn severity(&self) -> Severity {
        match self.status {
            Some(status) if status >= 500 => Severity::High,
            Some(status) if status >= 400 => Severity::Medium,
            _ if self.is_network_error() => Severity::High,
            _ => Severity::Low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_is_message() {
        let error = ApiError::new("Failed to process payment");
        assert_eq!(error.to_string(), "Failed to process payment");
    }

    #[test]
    fn test_error_code_wire_names() {
        assert_eq!(ErrorCode::ConnectionRefused.as_str(), "ECONNREFUSED");
        assert_eq!(ErrorCode::HostNotFound.to_string(), "ENOTFOUND");
        assert_eq!(
            serde_json::to_value(ErrorCode::ConnectionAborted).unwrap(),
            serde_json::json!("ECONNABORTED")
        );
    }

    #[test]
    fn test_retryable_codes() {
        assert!(ErrorCode::ConnectionRefused.is_retryable());
        assert!(ErrorCode::HostNotFound.is_retryable());
        assert!(ErrorCode::ConnectionAborted.is_retryable());
        assert!(!ErrorCode::Network.is_retryable());
        assert!(!ErrorCode::BadRequest.is_retryable());
        assert!(!ErrorCode::BadResponse.is_retryable());
    }

    #[test]
    fn test_code_for_status() {
        assert_eq!(ErrorCode::for_status(404), ErrorCode::BadRequest);
        assert_eq!(ErrorCode::for_status(500), ErrorCode::BadResponse);
    }

    #[test]
    fn test_server_error_is_not_retryable() {
        let error = ApiError::new("Internal error")
            .with_status(503)
            .with_code(ErrorCode::BadResponse);
        assert!(!error.is_retryable());
        assert!(!error.is_network_error());
        assert_eq!(error.severity(), Severity::High);
    }

    #[test]
    fn test_timeout_message_counts_as_network() {
        let error = ApiError::new("timeout of 10000ms exceeded");
        assert!(error.is_network_error());
        assert_eq!(error.severity(), Severity::High);
    }

    #[test]
    fn test_validation_error_shape() {
        let error = ApiError::validation("cardNumber", "Card number must be 16 digits");
        assert!(error.is_validation());
        assert!(!error.is_retryable());
        assert_eq!(error.details, Some(serde_json::json!({ "field": "cardNumber" })));
    }

    #[test]
    fn test_serialization_skips_absent_fields() {
        let error = ApiError::new("Transaction not found").with_status(404);
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "Transaction not found", "status": 404 }));
    }
}

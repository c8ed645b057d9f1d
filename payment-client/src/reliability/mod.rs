//! Reliability patterns for payment operations.
//!
//! Provides bounded retry for transient connection failures.

mod retry;

pub use retry::{RetryEvent, RetryPolicy, is_retryable, retry_with_backoff};

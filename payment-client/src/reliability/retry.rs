//! Bounded retry logic for transient connection failures.
//!
//! Payment creation is retried only when the backend could not be reached
//! at all. The default policy makes three attempts with a fixed one-second
//! pause between them; exponential growth is available through
//! [`RetryPolicy::backoff_multiplier`].

use std::time::Duration;

use crate::error::ApiError;

/// Configuration for retry behavior.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use payment_client::reliability::RetryPolicy;
///
/// // Default policy: 3 attempts, fixed 1s delay
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_retries(), 2);
///
/// // Custom policy: exponential backoff
/// let backoff = RetryPolicy {
///     max_attempts: 5,
///     initial_delay: Duration::from_millis(50),
///     max_delay: Duration::from_secs(10),
///     backoff_multiplier: 2.0,
/// };
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (default: 3)
    pub max_attempts: u32,
    /// Delay before the first retry (default: 1s)
    pub initial_delay: Duration,
    /// Maximum delay between retries (default: 1s)
    pub max_delay: Duration,
    /// Multiplier applied per retry (default: 1.0, fixed delay)
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// Creates a policy with a constant delay between attempts.
    #[must_use]
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, initial_delay: delay, max_delay: delay, backoff_multiplier: 1.0 }
    }

    /// Creates a policy with custom maximum attempts.
    ///
    /// # Examples
    ///
    /// ```
    /// use payment_client::reliability::RetryPolicy;
    ///
    /// let policy = RetryPolicy::with_max_attempts(5);
    /// assert_eq!(policy.max_attempts, 5);
    /// ```
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self { max_attempts, ..Self::default() }
    }

    /// Returns how many retries follow the first attempt.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_attempts.saturating_sub(1)
    }

    /// Calculates the delay before retry number `attempt + 1`.
    ///
    /// delay = `initial_delay` * (multiplier ^ attempt), capped at `max_delay`.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        #[allow(
            clippy::cast_precision_loss,
            reason = "acceptable for duration calculations"
        )]
        let delay_ms = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "delay_ms is positive and saturates on overflow"
        )]
        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(self.max_delay)
    }
}

/// Details of a retry about to happen, passed to the `on_retry` callback.
#[derive(Debug)]
pub struct RetryEvent<'a, E> {
    /// 1-based number of the retry about to run.
    pub retry: u32,
    /// Retries allowed by the policy.
    pub max_retries: u32,
    /// Pause before the retry starts.
    pub delay: Duration,
    /// Failure of the previous attempt.
    pub error: &'a E,
}

/// Executes an operation, retrying failures accepted by `should_retry`.
///
/// Runs at most `max_attempts` times. Failures rejected by `should_retry`
/// are returned immediately. Before each retry `on_retry` is invoked and
/// the task sleeps for the policy delay.
///
/// # Examples
///
/// ```
/// use std::sync::{
///     Arc,
///     atomic::{AtomicU32, Ordering},
/// };
///
/// use payment_client::reliability::{RetryPolicy, retry_with_backoff};
///
/// # async fn example() -> Result<String, String> {
/// let policy = RetryPolicy::with_max_attempts(3);
/// let attempt = Arc::new(AtomicU32::new(0));
///
/// let result = retry_with_backoff(
///     &policy,
///     || {
///         let attempt = Arc::clone(&attempt);
///         async move {
///             let n = attempt.fetch_add(1, Ordering::Relaxed);
///             if n < 2 { Err("temporary failure".to_owned()) } else { Ok("success".to_owned()) }
///         }
///     },
///     |_| true,
///     |event| println!("retry {}/{}", event.retry, event.max_retries),
/// )
/// .await?;
///
/// assert_eq!(result, "success");
/// # Ok(result)
/// # }
/// ```
///
/// # Errors
///
/// Returns the first non-retryable error, or the last error once all
/// attempts are exhausted.
pub async fn retry_with_backoff<F, Fut, T, E, R, N>(
    policy: &RetryPolicy,
    mut operation: F,
    should_retry: R,
    mut on_retry: N,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
    N: FnMut(RetryEvent<'_, E>),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempt = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                attempt += 1;
                if attempt >= max_attempts || !should_retry(&error) {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %error,
                        "Operation failed, giving up"
                    );
                    return Err(error);
                }

                let delay = policy.delay_for_attempt(attempt - 1);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis(),
                    error = %error,
                    "Operation failed, retrying"
                );
                on_retry(RetryEvent {
                    retry: attempt,
                    max_retries: max_attempts - 1,
                    delay,
                    error: &error,
                });
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Determines if an error is retryable.
///
/// Only connection refused, host not found and client-side timeouts are
/// retried. Any error where the backend produced a response is final, as is
/// a failed local validation.
///
/// # Examples
///
/// ```
/// use payment_client::{
///     error::{ApiError, ErrorCode},
///     reliability::is_retryable,
/// };
///
/// let refused = ApiError::new("connect ECONNREFUSED").with_code(ErrorCode::ConnectionRefused);
/// assert!(is_retryable(&refused));
///
/// let declined = ApiError::new("Card declined").with_status(402).with_code(ErrorCode::BadRequest);
/// assert!(!is_retryable(&declined));
/// ```
#[must_use]
pub fn is_retryable(error: &ApiError) -> bool {
    error.status.is_none() && error.is_retryable()
}

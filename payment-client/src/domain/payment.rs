//! Payment submission with connection retry.

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::{
    entity::StateHandle,
    error::{ApiError, Result},
    models::{PaymentRequest, PaymentResponse, Transaction},
    notify::{Notification, Notifier},
    payments::{CREATE_FALLBACK, PaymentApi},
    reliability::{RetryPolicy, is_retryable, retry_with_backoff},
    store::TransactionCache,
    transport::{HttpTransport, Transport},
};

/// Notification for an approved payment.
pub const APPROVED_MESSAGE: &str = "Payment processed successfully!";

/// Notification for a payment the backend accepted but did not approve.
pub const DECLINED_MESSAGE: &str = "Payment failed - transaction declined";

/// Submits payments, retrying connection failures.
///
/// An HTTP-successful submission is never an error, even when the payment
/// was declined: the status decides which notification is shown. Each
/// accepted submission replaces the cached last transaction.
#[derive(Debug)]
pub struct PaymentService<X = HttpTransport> {
    api: PaymentApi<X>,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
    cache: Option<TransactionCache>,
    show_toast: bool,
    state: StateHandle,
    retry_count: Arc<AtomicU32>,
}

impl<X> Clone for PaymentService<X> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            notifier: Arc::clone(&self.notifier),
            retry: self.retry.clone(),
            cache: self.cache.clone(),
            show_toast: self.show_toast,
            state: self.state.clone(),
            retry_count: Arc::clone(&self.retry_count),
        }
    }
}

impl<X: Transport> PaymentService<X> {
    /// Creates a service with the default retry policy and no cache.
    pub fn new(api: PaymentApi<X>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            retry: RetryPolicy::default(),
            cache: None,
            show_toast: true,
            state: StateHandle::new(),
            retry_count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Records accepted submissions in `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: TransactionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Enables or disables notifications.
    #[must_use]
    pub const fn with_toasts(mut self, show_toast: bool) -> Self {
        self.show_toast = show_toast;
        self
    }

    /// Returns `true` while a submission is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Returns the last failure.
    #[must_use]
    pub fn error(&self) -> Option<ApiError> {
        self.state.error()
    }

    /// Returns the number of the retry in progress, `0` when none is.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count.load(Ordering::SeqCst)
    }

    /// Returns the shared state cell.
    #[must_use]
    pub const fn state(&self) -> &StateHandle {
        &self.state
    }

    /// Submits a payment.
    ///
    /// The request is format-checked first; a failed check is reported and
    /// nothing is sent. Connection failures (refused, unknown host,
    /// timeout) are retried according to the retry policy, with a
    /// `Connection failed. Retrying... (n/m)` notification before each
    /// retry.
    ///
    /// # Errors
    ///
    /// Returns the validation error, the first non-retryable failure, or
    /// the last failure once retries are exhausted.
    #[instrument(skip(self, request), fields(card = %request.masked_card_number(), amount = %request.amount))]
    pub async fn process_payment(&self, request: &PaymentRequest) -> Result<PaymentResponse> {
        let _loading = self.state.begin();
        self.retry_count.store(0, Ordering::SeqCst);

        if let Err(invalid) = request.validate() {
            warn!(error = %invalid, "Payment request rejected before sending");
            return Err(self.fail(invalid));
        }

        let result = retry_with_backoff(
            &self.retry,
            || {
                self.state.clear_error();
                self.api.create(request)
            },
            is_retryable,
            |event| {
                self.retry_count.store(event.retry, Ordering::SeqCst);
                self.state.set_error(event.error.clone());
                self.toast(Notification::error(format!(
                    "Connection failed. Retrying... ({}/{})",
                    event.retry, event.max_retries
                )));
            },
        )
        .await;

        match result {
            Ok(response) => {
                self.retry_count.store(0, Ordering::SeqCst);
                if response.is_success() {
                    info!(transaction_id = %response.transaction_id, "Payment approved");
                    self.toast(Notification::success(APPROVED_MESSAGE));
                } else {
                    info!(
                        transaction_id = %response.transaction_id,
                        status = %response.status,
                        "Payment declined"
                    );
                    self.toast(Notification::error(DECLINED_MESSAGE));
                }
                self.remember(request, &response);
                Ok(response)
            }
            Err(failure) => Err(self.fail(failure)),
        }
    }

    /// Clears the error and retry counter when a failure is showing and
    /// retries remain.
    pub fn retry_payment(&self) {
        if self.state.error().is_some() && self.retry_count() < self.retry.max_retries() {
            self.state.clear_error();
            self.retry_count.store(0, Ordering::SeqCst);
        }
    }

    fn remember(&self, request: &PaymentRequest, response: &PaymentResponse) {
        let Some(cache) = &self.cache else {
            return;
        };
        let transaction = Transaction::from_submission(request, response, Utc::now());
        if let Err(e) = cache.set(transaction) {
            warn!(error = %e, "Failed to persist last transaction");
        }
    }

    fn fail(&self, failure: ApiError) -> ApiError {
        error!(error = %failure, status = failure.status, code = ?failure.code, "Payment failed");
        self.retry_count.store(0, Ordering::SeqCst);
        self.state.set_error(failure.clone());
        let message =
            if failure.message.is_empty() { CREATE_FALLBACK.to_owned() } else { failure.message.clone() };
        self.toast(Notification::error(message));
        failure
    }

    fn toast(&self, notification: Notification) {
        if self.show_toast {
            self.notifier.notify(notification);
        }
    }
}

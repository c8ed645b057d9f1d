//! Transaction lookup and history.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::instrument;

use crate::{
    entity::StateHandle,
    error::{ApiError, Result},
    models::Transaction,
    notify::{Notification, Notifier},
    payments::{GET_FALLBACK, LIST_FALLBACK, NOT_FOUND_MESSAGE, PaymentApi},
    transport::{HttpTransport, Transport},
};

/// Looks up single transactions.
#[derive(Debug)]
pub struct TransactionLookup<X = HttpTransport> {
    api: PaymentApi<X>,
    notifier: Arc<dyn Notifier>,
    show_toast: bool,
    state: StateHandle,
}

impl<X> Clone for TransactionLookup<X> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            notifier: Arc::clone(&self.notifier),
            show_toast: self.show_toast,
            state: self.state.clone(),
        }
    }
}

impl<X: Transport> TransactionLookup<X> {
    /// Creates a lookup.
    pub fn new(api: PaymentApi<X>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier, show_toast: true, state: StateHandle::new() }
    }

    /// Enables or disables notifications.
    #[must_use]
    pub const fn with_toasts(mut self, show_toast: bool) -> Self {
        self.show_toast = show_toast;
        self
    }

    /// Returns `true` while a lookup is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Returns the last failure.
    #[must_use]
    pub fn error(&self) -> Option<ApiError> {
        self.state.error()
    }

    /// Returns the shared state cell.
    #[must_use]
    pub const fn state(&self) -> &StateHandle {
        &self.state
    }

    /// Fetches one transaction.
    ///
    /// An unknown id is notified as `Transaction not found`.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from [`PaymentApi::get_by_id`].
    #[instrument(skip(self))]
    pub async fn get_transaction(&self, transaction_id: &str) -> Result<Transaction> {
        let _loading = self.state.begin();
        self.api.get_by_id(transaction_id).await.map_err(|error| {
            self.state.set_error(error.clone());
            let message = if error.is_not_found() {
                NOT_FOUND_MESSAGE
            } else if error.message.is_empty() {
                GET_FALLBACK
            } else {
                error.message.as_str()
            };
            if self.show_toast {
                self.notifier.notify(Notification::error(message));
            }
            error
        })
    }
}

/// Fetches the transaction history and keeps the latest list.
#[derive(Debug)]
pub struct TransactionHistory<X = HttpTransport> {
    api: PaymentApi<X>,
    notifier: Arc<dyn Notifier>,
    show_toast: bool,
    state: StateHandle,
    transactions: Arc<Mutex<Vec<Transaction>>>,
}

impl<X> Clone for TransactionHistory<X> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            notifier: Arc::clone(&self.notifier),
            show_toast: self.show_toast,
            state: self.state.clone(),
            transactions: Arc::clone(&self.transactions),
        }
    }
}

impl<X: Transport> TransactionHistory<X> {
    /// Creates a history with an empty list.
    pub fn new(api: PaymentApi<X>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            show_toast: true,
            state: StateHandle::new(),
            transactions: Arc::default(),
        }
    }

    /// Enables or disables notifications.
    #[must_use]
    pub const fn with_toasts(mut self, show_toast: bool) -> Self {
        self.show_toast = show_toast;
        self
    }

    /// Returns `true` while a fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Returns the last failure.
    #[must_use]
    pub fn error(&self) -> Option<ApiError> {
        self.state.error()
    }

    /// Returns the shared state cell.
    #[must_use]
    pub const fn state(&self) -> &StateHandle {
        &self.state
    }

    /// Returns the most recently fetched list.
    #[must_use]
    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Fetches all transactions and replaces the kept list.
    ///
    /// On failure the kept list is left untouched.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from [`PaymentApi::get_all`].
    #[instrument(skip(self))]
    pub async fn fetch_transactions(&self) -> Result<Vec<Transaction>> {
        let _loading = self.state.begin();
        match self.api.get_all().await {
            Ok(transactions) => {
                tracing::debug!(count = transactions.len(), "Transactions fetched");
                transactions.clone_into(
                    &mut self.transactions.lock().unwrap_or_else(PoisonError::into_inner),
                );
                Ok(transactions)
            }
            Err(error) => {
                self.state.set_error(error.clone());
                if self.show_toast {
                    let message =
                        if error.message.is_empty() { LIST_FALLBACK } else { error.message.as_str() };
                    self.notifier.notify(Notification::error(message));
                }
                Err(error)
            }
        }
    }
}

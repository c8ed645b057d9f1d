//! Domain services for payments and transactions.
//!
//! [`PaymentClient`] wires one [`ApiClient`], one notifier, the retry
//! policy and the optional last-transaction cache into the services below.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use payment_client::{
//!     config::ClientConfig,
//!     domain::PaymentClient,
//!     models::{CurrencyCode, PaymentRequest},
//!     notify::TracingNotifier,
//!     store::TransactionCache,
//! };
//! use rust_decimal::Decimal;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::default();
//! let client = PaymentClient::from_config(&config, Arc::new(TracingNotifier))?
//!     .with_cache(TransactionCache::from_config(&config.cache)?);
//!
//! let request = PaymentRequest {
//!     card_number: "4111111111111112".to_owned(),
//!     expiry_month: 12,
//!     expiry_year: 2030,
//!     cvv: "123".to_owned(),
//!     amount: Decimal::new(10000, 2),
//!     currency_code: CurrencyCode::Usd,
//! };
//! let response = client.payments().process_payment(&request).await?;
//! println!("{} -> {}", response.transaction_id, response.status);
//! # Ok(())
//! # }
//! ```

mod payment;
mod transactions;

use std::sync::Arc;

use serde::de::DeserializeOwned;

pub use payment::{APPROVED_MESSAGE, DECLINED_MESSAGE, PaymentService};
pub use transactions::{TransactionHistory, TransactionLookup};

use crate::{
    client::ApiClient,
    config::{ClientConfig, ConfigError},
    entity::{EntityOptions, EntityResource},
    notify::Notifier,
    payments::PaymentApi,
    reliability::RetryPolicy,
    store::TransactionCache,
    transport::{HttpTransport, Transport},
};

/// Entry point bundling the shared pieces of the domain services.
#[derive(Debug)]
pub struct PaymentClient<X = HttpTransport> {
    client: ApiClient<X>,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
    cache: Option<TransactionCache>,
    show_toast: bool,
}

impl<X> Clone for PaymentClient<X> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            notifier: Arc::clone(&self.notifier),
            retry: self.retry.clone(),
            cache: self.cache.clone(),
            show_toast: self.show_toast,
        }
    }
}

impl PaymentClient<HttpTransport> {
    /// Builds an HTTP-backed client from configuration.
    ///
    /// The cache is not opened here; attach one with
    /// [`PaymentClient::with_cache`].
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(
        config: &ClientConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(ApiClient::new(config)?, notifier)
            .with_retry_policy(config.retry.policy())
            .with_toasts(config.show_toast))
    }
}

impl<X: Transport> PaymentClient<X> {
    /// Wraps an existing [`ApiClient`] with default settings.
    pub fn new(client: ApiClient<X>, notifier: Arc<dyn Notifier>) -> Self {
        Self { client, notifier, retry: RetryPolicy::default(), cache: None, show_toast: true }
    }

    /// Replaces the retry policy used for payment submission.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Attaches the last-transaction cache.
    #[must_use]
    pub fn with_cache(mut self, cache: TransactionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Enables or disables notifications for every service.
    #[must_use]
    pub const fn with_toasts(mut self, show_toast: bool) -> Self {
        self.show_toast = show_toast;
        self
    }

    /// Returns the attached cache.
    #[must_use]
    pub const fn cache(&self) -> Option<&TransactionCache> {
        self.cache.as_ref()
    }

    /// Returns the payments resource API.
    #[must_use]
    pub fn api(&self) -> PaymentApi<X> {
        PaymentApi::new(self.client.clone())
    }

    /// Creates a payment service with its own state.
    #[must_use]
    pub fn payments(&self) -> PaymentService<X> {
        let service = PaymentService::new(self.api(), Arc::clone(&self.notifier))
            .with_retry_policy(self.retry.clone())
            .with_toasts(self.show_toast);
        match &self.cache {
            Some(cache) => service.with_cache(cache.clone()),
            None => service,
        }
    }

    /// Creates a transaction lookup with its own state.
    #[must_use]
    pub fn transaction_lookup(&self) -> TransactionLookup<X> {
        TransactionLookup::new(self.api(), Arc::clone(&self.notifier)).with_toasts(self.show_toast)
    }

    /// Creates a transaction history with its own state and list.
    #[must_use]
    pub fn transaction_history(&self) -> TransactionHistory<X> {
        TransactionHistory::new(self.api(), Arc::clone(&self.notifier)).with_toasts(self.show_toast)
    }

    /// Creates a generic resource for `endpoint`.
    ///
    /// `options.show_toast` is combined with the client-wide setting.
    #[must_use]
    pub fn entity<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: EntityOptions<T>,
    ) -> EntityResource<T, X> {
        let show_toast = options.show_toast && self.show_toast;
        EntityResource::new(
            self.client.clone(),
            endpoint,
            Arc::clone(&self.notifier),
            options.show_toast(show_toast),
        )
    }
}

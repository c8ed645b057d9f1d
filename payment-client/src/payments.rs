//! Payments resource API.
//!
//! Translates [`ApiClient`] results for `/api/payments` into domain values
//! or [`ApiError`]s with stable, user-presentable messages.

use tracing::{debug, instrument};

use crate::{
    client::{ApiClient, resource_path},
    error::{ApiError, Result},
    models::{PaymentRequest, PaymentResponse, Transaction},
    transport::{HttpTransport, Transport},
};

/// Collection endpoint for payments.
pub const PAYMENTS_ENDPOINT: &str = "/api/payments";

/// Fallback message for failed payment creation.
pub const CREATE_FALLBACK: &str = "Failed to process payment";

/// Fallback message for a failed single lookup.
pub const GET_FALLBACK: &str = "Failed to fetch transaction";

/// Fallback message for a failed listing.
pub const LIST_FALLBACK: &str = "Failed to fetch transactions";

/// Message for a lookup of an unknown transaction.
pub const NOT_FOUND_MESSAGE: &str = "Transaction not found";

/// Payments resource.
///
/// # Examples
///
/// ```rust,no_run
/// use payment_client::{client::ApiClient, config::ClientConfig, payments::PaymentApi};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let api = PaymentApi::new(ApiClient::new(&ClientConfig::default())?);
/// match api.get_by_id("txn-123").await {
///     Ok(transaction) => println!("{}: {}", transaction.transaction_id, transaction.status),
///     Err(e) if e.is_not_found() => println!("{e}"),
///     Err(e) => return Err(e.into()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PaymentApi<T = HttpTransport> {
    client: ApiClient<T>,
}

impl<T> Clone for PaymentApi<T> {
    fn clone(&self) -> Self {
        Self { client: self.client.clone() }
    }
}

impl<T: Transport> PaymentApi<T> {
    /// Creates the resource over `client`.
    #[must_use]
    pub const fn new(client: ApiClient<T>) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    #[must_use]
    pub const fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    /// Submits a payment.
    ///
    /// The message of a failure is taken from the backend's `message`, then
    /// its `error`, then the transport message, then [`CREATE_FALLBACK`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] carrying status, body and transport code of the
    /// failed request.
    #[instrument(skip(self, request), fields(card = %request.masked_card_number(), currency = %request.currency_code))]
    pub async fn create(&self, request: &PaymentRequest) -> Result<PaymentResponse> {
        let response: PaymentResponse = self
            .client
            .post(PAYMENTS_ENDPOINT, request)
            .await
            .map_err(|failure| {
                let message = failure
                    .data_str("message")
                    .or_else(|| failure.data_str("error"))
                    .or_else(|| Some(failure.message.as_str()).filter(|m| !m.is_empty()))
                    .unwrap_or(CREATE_FALLBACK)
                    .to_owned();
                failure.into_api_error(message)
            })?;

        debug!(transaction_id = %response.transaction_id, status = %response.status, "Payment submitted");
        Ok(response)
    }

    /// Fetches one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] with status 404 and message
    /// [`NOT_FOUND_MESSAGE`] for unknown ids; other failures use the
    /// backend's `message` or [`GET_FALLBACK`]. A malformed `id` is a
    /// validation error and is never sent.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: &str) -> Result<Transaction> {
        let path = resource_path(PAYMENTS_ENDPOINT, id)
            .map_err(|message| ApiError::validation("id", message))?;

        self.client.get(&path).await.map_err(|failure| {
            if failure.status() == Some(404) {
                return failure.into_api_error(NOT_FOUND_MESSAGE);
            }
            let message = failure.data_str("message").unwrap_or(GET_FALLBACK).to_owned();
            failure.into_api_error(message)
        })
    }

    /// Lists all transactions. No pagination parameters are sent.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] with the backend's `message` or
    /// [`LIST_FALLBACK`].
    #[instrument(skip(self))]
    pub async fn get_all(&self) -> Result<Vec<Transaction>> {
        let transactions: Option<Vec<Transaction>> =
            self.client.get(PAYMENTS_ENDPOINT).await.map_err(|failure| {
                let message = failure.data_str("message").unwrap_or(LIST_FALLBACK).to_owned();
                failure.into_api_error(message)
            })?;
        Ok(transactions.unwrap_or_default())
    }
}

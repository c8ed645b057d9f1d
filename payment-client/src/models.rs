//! Payment data models.
//!
//! Wire types exchanged with the payment backend. Field names follow the
//! backend's camelCase JSON; amounts travel as JSON numbers.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// Status string the backend uses for an approved payment.
pub const SUCCESS_STATUS: &str = "Success";

/// Number of digits in an accepted card number.
pub const CARD_NUMBER_LENGTH: usize = 16;

/// Currencies accepted by the payment form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    /// Malawian Kwacha.
    Mwk,
    /// US Dollar.
    #[default]
    Usd,
    /// South African Rand.
    Zar,
}

impl CurrencyCode {
    /// All supported currencies, in display order.
    pub const ALL: [Self; 3] = [Self::Mwk, Self::Usd, Self::Zar];

    /// Returns the ISO 4217 code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mwk => "MWK",
            Self::Usd => "USD",
            Self::Zar => "ZAR",
        }
    }

    /// Returns a display label such as `US Dollar (USD)`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mwk => "Malawian Kwacha (MWK)",
            Self::Usd => "US Dollar (USD)",
            Self::Zar => "South African Rand (ZAR)",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|currency| currency.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ApiError::validation("currencyCode", format!("Unsupported currency: {s}")))
    }
}

/// Card payment submitted to the backend.
///
/// Created once from user input, sent once, never mutated. The `Debug`
/// output redacts the card number and CVV.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Card number, digits only.
    pub card_number: String,
    /// Expiry month, 1-12.
    pub expiry_month: u32,
    /// Four-digit expiry year.
    pub expiry_year: i32,
    /// Card verification value, 3 or 4 digits.
    pub cvv: String,
    /// Amount to charge.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency_code: CurrencyCode,
}

impl PaymentRequest {
    /// Checks field formats against the current UTC year.
    ///
    /// # Errors
    ///
    /// Returns a validation [`ApiError`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.validate_at(Utc::now().year())
    }

    /// Checks field formats, treating `current_year` as the earliest valid
    /// expiry year.
    ///
    /// Only formats are checked. Whether the card is real is the backend's
    /// business.
    ///
    /// # Errors
    ///
    /// Returns a validation [`ApiError`] naming the first offending field.
    ///
    /// # Examples
    ///
    /// ```
    /// use payment_client::models::{CurrencyCode, PaymentRequest};
    /// use rust_decimal::Decimal;
    ///
    /// let request = PaymentRequest {
    ///     card_number: "4111111111111112".to_owned(),
    ///     expiry_month: 12,
    ///     expiry_year: 2030,
    ///     cvv: "123".to_owned(),
    ///     amount: Decimal::new(10000, 2),
    ///     currency_code: CurrencyCode::Usd,
    /// };
    /// assert!(request.validate_at(2026).is_ok());
    /// assert!(request.validate_at(2031).is_err());
    /// ```
    pub fn validate_at(&self, current_year: i32) -> Result<()> {
        if self.card_number.len() != CARD_NUMBER_LENGTH || !is_ascii_digits(&self.card_number) {
            return Err(ApiError::validation("cardNumber", "Card number must be 16 digits"));
        }
        if !(1..=12).contains(&self.expiry_month) {
            return Err(ApiError::validation("expiryMonth", "Invalid month"));
        }
        if self.expiry_year < current_year {
            return Err(ApiError::validation("expiryYear", "Year must be in the future"));
        }
        if !(3..=4).contains(&self.cvv.len()) || !is_ascii_digits(&self.cvv) {
            return Err(ApiError::validation("cvv", "CVV must be 3 or 4 digits"));
        }
        if self.amount < Decimal::new(1, 2) {
            return Err(ApiError::validation("amount", "Amount must be at least 0.01"));
        }
        Ok(())
    }

    /// Returns the card number masked for display.
    #[must_use]
    pub fn masked_card_number(&self) -> String {
        mask_card_number(&self.card_number)
    }
}

impl fmt::Debug for PaymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentRequest")
            .field("card_number", &self.masked_card_number())
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .field("cvv", &"***")
            .field("amount", &self.amount)
            .field("currency_code", &self.currency_code)
            .finish()
    }
}

fn is_ascii_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Backend answer to a payment submission.
///
/// A well-formed response is an HTTP success even when the payment itself
/// was declined; check [`PaymentResponse::is_success`] for the business
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    /// Opaque transaction identifier.
    pub transaction_id: String,
    /// Business outcome, e.g. `Success` or `Failed`.
    pub status: String,
    /// Optional explanation from the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PaymentResponse {
    /// Returns `true` only when the status is exactly `Success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SUCCESS_STATUS
    }
}

/// Processed transaction as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Opaque transaction identifier.
    pub transaction_id: String,
    /// Card number with everything but the last four digits hidden.
    pub masked_card_number: String,
    /// Business outcome.
    pub status: String,
    /// Charged amount.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: String,
    /// Message from the issuing bank, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_message: Option<String>,
    /// Processing time as an ISO-8601 string.
    pub processed_at: String,
}

impl Transaction {
    /// Builds the record kept for quick redisplay after a submission.
    ///
    /// The card number is masked; the bank message is unknown at this point.
    #[must_use]
    pub fn from_submission(
        request: &PaymentRequest,
        response: &PaymentResponse,
        processed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: response.transaction_id.clone(),
            masked_card_number: request.masked_card_number(),
            status: response.status.clone(),
            amount: request.amount,
            currency_code: request.currency_code.as_str().to_owned(),
            bank_message: None,
            processed_at: processed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Returns `true` only when the status is exactly `Success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SUCCESS_STATUS
    }

    /// Parses [`Transaction::processed_at`], if it is valid RFC 3339.
    #[must_use]
    pub fn processed_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.processed_at)
            .ok()
            .map(|timestamp| timestamp.with_timezone(&Utc))
    }
}

/// Masks a card number down to its last four characters.
///
/// # Examples
///
/// ```
/// use payment_client::models::mask_card_number;
///
/// assert_eq!(mask_card_number("4111111111111112"), "**** **** **** 1112");
/// ```
#[must_use]
pub fn mask_card_number(card_number: &str) -> String {
    let last4: String = card_number
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("**** **** **** {last4}")
}

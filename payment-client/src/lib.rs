//! Payment Client: API client layer for a card-payment gateway.
//!
//! Submits card payments, looks up transactions and lists transaction
//! history against a payment backend reachable over HTTP. No payment logic
//! lives here: the backend authorizes, settles and stores everything.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  domain: PaymentService, TransactionLookup,  │  retry, status branching,
//! │          TransactionHistory                  │  notifications, cache
//! ├──────────────────────────────────────────────┤
//! │  entity: EntityResource<T>                   │  generic CRUD + state
//! ├──────────────────────────────────────────────┤
//! │  payments: PaymentApi                        │  /api/payments messages
//! ├──────────────────────────────────────────────┤
//! │  client: ApiClient                           │  logging, normalization
//! ├──────────────────────────────────────────────┤
//! │  transport: Transport / HttpTransport        │  reqwest
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Results flow back up; every failure reaching a caller is an
//! [`ApiError`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use payment_client::{config::ClientConfig, domain::PaymentClient, notify::TracingNotifier};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::default().with_env_overrides()?;
//! let client = PaymentClient::from_config(&config, Arc::new(TracingNotifier))?;
//!
//! let history = client.transaction_history();
//! for transaction in history.fetch_transactions().await? {
//!     println!("{} {} {}", transaction.transaction_id, transaction.amount, transaction.status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use payment_client::{config::ClientConfig, domain::PaymentClient, notify::TracingNotifier};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PaymentClient::from_config(&ClientConfig::default(), Arc::new(TracingNotifier))?;
//!
//! match client.transaction_lookup().get_transaction("txn-123").await {
//!     Ok(transaction) => println!("{}", transaction.status),
//!     Err(e) if e.is_not_found() => println!("no such transaction"),
//!     Err(e) if e.is_network_error() => eprintln!("backend unreachable: {e}"),
//!     Err(e) => eprintln!("lookup failed: {e}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`transport`]: network seam and the reqwest implementation
//! - [`client`]: HTTP client wrapper
//! - [`payments`]: payments resource API
//! - [`entity`]: generic entity layer with loading/error state
//! - [`domain`]: payment submission with retry, lookup, history
//! - [`store`]: last-transaction cache
//! - [`reliability`]: retry policy
//! - [`notify`]: notification sinks
//! - [`config`]: TOML configuration
//! - [`models`]: wire types
//! - [`error`]: error types

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from reqwest"
)]

pub mod client;
pub mod config;
pub mod domain;
pub mod entity;
pub mod error;
pub mod models;
pub mod notify;
pub mod payments;
pub mod reliability;
pub mod store;
pub mod transport;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use domain::PaymentClient;
pub use error::{ApiError, ErrorCode, Result};
pub use models::{CurrencyCode, PaymentRequest, PaymentResponse, Transaction};

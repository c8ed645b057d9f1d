//! Payment Console - command-line front end for the payment gateway client.
//!
//! Submits payments, looks up and lists transactions, and shows the cached
//! last transaction. Results are printed to stdout as JSON; notifications
//! and logs go to stderr.
//!
//! ```text
//! payment-console pay --card-number 4111111111111112 --expiry-month 12 \
//!     --expiry-year 2030 --cvv 123 --amount 100.00 --currency USD
//! payment-console lookup <transaction-id>
//! payment-console list
//! payment-console last
//! payment-console clear-last
//! ```

#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from reqwest"
)]

mod observability;

use std::{error::Error, path::PathBuf, process::ExitCode, sync::Arc};

use clap::{Parser, Subcommand};
use payment_client::{
    config::ClientConfig,
    domain::PaymentClient,
    models::{CurrencyCode, PaymentRequest},
    notify::{Notification, NotificationLevel, Notifier},
    store::TransactionCache,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::observability::{LogFormat, init_observability};

/// Command-line front end for the payment gateway.
#[derive(Debug, Parser)]
#[command(name = "payment-console", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "PAYMENT_CONSOLE_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL, overriding configuration and environment.
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit a card payment.
    Pay(PayArgs),
    /// Look up one transaction.
    Lookup {
        /// Transaction id.
        id: String,
    },
    /// List all transactions.
    List,
    /// Show the last submitted transaction.
    Last,
    /// Forget the last submitted transaction.
    ClearLast,
}

#[derive(Debug, clap::Args)]
struct PayArgs {
    /// 16-digit card number.
    #[arg(long)]
    card_number: String,
    /// Expiry month, 1-12.
    #[arg(long)]
    expiry_month: u32,
    /// Four-digit expiry year.
    #[arg(long)]
    expiry_year: i32,
    /// Card verification value.
    #[arg(long)]
    cvv: String,
    /// Amount to charge.
    #[arg(long)]
    amount: Decimal,
    /// Currency: MWK, USD or ZAR.
    #[arg(long, default_value_t = CurrencyCode::Usd)]
    currency: CurrencyCode,
}

impl From<PayArgs> for PaymentRequest {
    fn from(args: PayArgs) -> Self {
        Self {
            card_number: args.card_number,
            expiry_month: args.expiry_month,
            expiry_year: args.expiry_year,
            cvv: args.cvv,
            amount: args.amount,
            currency_code: args.currency,
        }
    }
}

/// Prints notifications to stderr.
#[derive(Debug, Clone, Copy)]
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        let marker = match notification.level {
            NotificationLevel::Success => "ok",
            NotificationLevel::Error => "!!",
        };
        eprintln!("[{marker}] {}", notification.message);
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig, Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    let mut config = config.with_env_overrides()?;

    if let Some(base_url) = &cli.base_url {
        config.base_url.clone_from(base_url);
        config.validate()?;
    }
    if config.cache.dir.is_none() {
        config.cache.dir = Some(std::env::temp_dir().join("payment-console"));
    }
    Ok(config)
}

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = load_config(&cli)?;
    let cache = TransactionCache::from_config(&config.cache)?;
    let client = PaymentClient::from_config(&config, Arc::new(TerminalNotifier))?.with_cache(cache);

    match cli.command {
        Command::Pay(args) => {
            let request = PaymentRequest::from(args);
            let response = client.payments().process_payment(&request).await?;
            print_json(&response)?;
        }
        Command::Lookup { id } => {
            let transaction = client.transaction_lookup().get_transaction(&id).await?;
            print_json(&transaction)?;
        }
        Command::List => {
            let transactions = client.transaction_history().fetch_transactions().await?;
            print_json(&transactions)?;
        }
        Command::Last => match client.cache().and_then(TransactionCache::get) {
            Some(transaction) => print_json(&transaction)?,
            None => eprintln!("No transaction submitted yet"),
        },
        Command::ClearLast => {
            if let Some(cache) = client.cache() {
                cache.clear()?;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_observability(LogFormat::from_env());

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

//! Last-transaction cache.
//!
//! Holds at most one [`Transaction`], replaced wholesale on every write and
//! persisted through a [`CacheStorage`] backend under the record name
//! [`STORE_NAME`]:
//!
//! ```json
//! {"state":{"lastTransaction":{...}},"version":0}
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{config::CacheConfig, models::Transaction};

/// Name of the persisted record.
pub const STORE_NAME: &str = "payment-store";

/// Version written into the envelope.
pub const STORE_VERSION: u32 = 0;

/// Cache persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing storage failed.
    #[error("cache storage I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The persisted record is not a valid envelope.
    #[error("cache record is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Backend holding the serialized cache record.
pub trait CacheStorage: Send + Sync + std::fmt::Debug {
    /// Returns the stored record, or `None` if nothing was stored yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the storage cannot be read.
    fn load(&self) -> Result<Option<String>, StoreError>;

    /// Replaces the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the storage cannot be written.
    fn save(&self, record: &str) -> Result<(), StoreError>;
}

/// Volatile storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    record: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.record.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, record: &str) -> Result<(), StoreError> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(record.to_owned());
        Ok(())
    }
}

/// JSON file storage at `{dir}/payment-store.json`.
///
/// Writes go to a temporary sibling first and are renamed into place.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Stores the record inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(format!("{STORE_NAME}.json")) }
    }

    /// Returns the record path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStorage for FileStorage {
    fn load(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, record: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, record)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheState {
    #[serde(default)]
    last_transaction: Option<Transaction>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    state: CacheState,
    #[serde(default)]
    version: u32,
}

/// Shared handle to the last-transaction cache.
///
/// Clones see the same value. Every write is persisted before it returns.
///
/// # Examples
///
/// ```
/// use payment_client::store::TransactionCache;
///
/// let cache = TransactionCache::in_memory();
/// assert!(cache.get().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct TransactionCache {
    inner: Arc<Mutex<Option<Transaction>>>,
    storage: Arc<dyn CacheStorage>,
}

impl TransactionCache {
    /// Loads the cache from `storage`. A missing record yields an empty
    /// cache.
    ///
    /// # Errors
    ///
    /// Returns error if the storage cannot be read or the record is
    /// corrupt.
    pub fn open(storage: impl CacheStorage + 'static) -> Result<Self, StoreError> {
        let last = match storage.load()? {
            Some(record) => serde_json::from_str::<Envelope>(&record)?.state.last_transaction,
            None => None,
        };
        debug!(cached = last.is_some(), "Transaction cache loaded");
        Ok(Self { inner: Arc::new(Mutex::new(last)), storage: Arc::new(storage) })
    }

    /// Opens the cache described by `config`: file-backed when a directory
    /// is set, in memory otherwise.
    ///
    /// # Errors
    ///
    /// Returns error if the file record cannot be read or is corrupt.
    pub fn from_config(config: &CacheConfig) -> Result<Self, StoreError> {
        match &config.dir {
            Some(dir) => Self::open(FileStorage::in_dir(dir)),
            None => Ok(Self::in_memory()),
        }
    }

    /// Creates an empty cache backed by [`MemoryStorage`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self { inner: Arc::new(Mutex::new(None)), storage: Arc::new(MemoryStorage::new()) }
    }

    /// Returns the cached transaction.
    #[must_use]
    pub fn get(&self) -> Option<Transaction> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the cached transaction.
    ///
    /// The in-memory value changes even if persisting fails.
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be persisted.
    pub fn set(&self, transaction: Transaction) -> Result<(), StoreError> {
        self.replace(Some(transaction))
    }

    /// Empties the cache.
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be persisted.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.replace(None)
    }

    fn replace(&self, value: Option<Transaction>) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = value;
        let envelope = Envelope {
            state: CacheState { last_transaction: guard.clone() },
            version: STORE_VERSION,
        };
        let record = serde_json::to_string(&envelope)?;
        self.storage.save(&record)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;

    fn transaction(id: &str) -> Transaction {
        Transaction {
            transaction_id: id.to_owned(),
            masked_card_number: "**** **** **** 1112".to_owned(),
            status: "Success".to_owned(),
            amount: Decimal::new(10000, 2),
            currency_code: "USD".to_owned(),
            bank_message: None,
            processed_at: "2026-10-17T09:30:00.000Z".to_owned(),
        }
    }

    #[test]
    fn test_in_memory_set_replaces() {
        let cache = TransactionCache::in_memory();
        cache.set(transaction("txn-1")).unwrap();
        cache.set(transaction("txn-2")).unwrap();
        assert_eq!(cache.get().unwrap().transaction_id, "txn-2");

        cache.clear().unwrap();
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_clones_share_value() {
        let cache = TransactionCache::in_memory();
        let other = cache.clone();
        cache.set(transaction("txn-1")).unwrap();
        assert_eq!(other.get(), Some(transaction("txn-1")));
    }

    #[test]
    fn test_envelope_format() {
        let storage = MemoryStorage::new();
        let cache = TransactionCache::open(storage.clone()).unwrap();
        cache.set(transaction("txn-1")).unwrap();

        let record: serde_json::Value =
            serde_json::from_str(&storage.load().unwrap().unwrap()).unwrap();
        assert_eq!(
            record,
            json!({
                "state": {
                    "lastTransaction": {
                        "transactionId": "txn-1",
                        "maskedCardNumber": "**** **** **** 1112",
                        "status": "Success",
                        "amount": 100.0,
                        "currencyCode": "USD",
                        "processedAt": "2026-10-17T09:30:00.000Z"
                    }
                },
                "version": 0
            })
        );

        cache.clear().unwrap();
        let record: serde_json::Value =
            serde_json::from_str(&storage.load().unwrap().unwrap()).unwrap();
        assert_eq!(record, json!({ "state": { "lastTransaction": null }, "version": 0 }));
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TransactionCache::open(FileStorage::in_dir(dir.path())).unwrap();
        assert!(cache.get().is_none());

        cache.set(transaction("txn-9")).unwrap();

        let reopened = TransactionCache::open(FileStorage::in_dir(dir.path())).unwrap();
        assert_eq!(reopened.get(), Some(transaction("txn-9")));
        assert!(dir.path().join("payment-store.json").exists());
    }

    #[test]
    fn test_file_storage_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("state").join("payments");
        let cache = TransactionCache::open(FileStorage::in_dir(&nested)).unwrap();
        cache.set(transaction("txn-1")).unwrap();
        assert!(nested.join("payment-store.json").exists());
    }

    #[test]
    fn test_from_config() {
        let cache = TransactionCache::from_config(&CacheConfig::default()).unwrap();
        assert!(cache.get().is_none());

        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig { dir: Some(dir.path().to_path_buf()) };
        TransactionCache::from_config(&config).unwrap().set(transaction("txn-3")).unwrap();
        assert_eq!(TransactionCache::from_config(&config).unwrap().get(), Some(transaction("txn-3")));
    }

    #[test]
    fn test_corrupt_record_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(dir.path());
        fs::write(storage.path(), "{not json").unwrap();

        assert!(matches!(TransactionCache::open(storage), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_record_without_transaction_loads_empty() {
        let storage = MemoryStorage::new();
        storage.save(r#"{"state":{},"version":0}"#).unwrap();
        assert!(TransactionCache::open(storage).unwrap().get().is_none());
    }
}

//! Key-value persistence
//!
//! The wallet keeps four independently keyed JSON blobs: the proof set, the
//! active token, the transaction ledger and the sent gift wraps. There is no
//! schema version field.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

mod file;
mod memory;

pub use self::file::FileKVStore;
pub use self::memory::MemoryKVStore;

/// Proof set key
pub const PROOFS_KEY: &str = "cashu_proofs";
/// Active bearer token key
pub const ACTIVE_TOKEN_KEY: &str = "current_cashu_token";
/// Transaction ledger key
pub const TRANSACTIONS_KEY: &str = "transaction_history";
/// Sent gift wraps key
pub const GIFT_WRAPS_KEY: &str = "cashu_gift_wraps";

/// Valid ASCII characters for keys in KV store
pub const KVSTORE_KEY_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_-";

/// Maximum length for keys in KV store
pub const KVSTORE_KEY_MAX_LEN: usize = 120;

/// Database error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serde Error
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    /// Io Error
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// KV Store invalid key
    #[error("Invalid KV store key: {0}")]
    KVStoreInvalidKey(String),
}

/// Validates that a key contains only valid KV store characters and is within length limits
pub fn validate_kvstore_key(key: &str) -> Result<(), Error> {
    if key.is_empty() {
        return Err(Error::KVStoreInvalidKey("key is empty".to_string()));
    }

    if key.len() > KVSTORE_KEY_MAX_LEN {
        return Err(Error::KVStoreInvalidKey(format!(
            "{KVSTORE_KEY_MAX_LEN} exceeds maximum length of key characters"
        )));
    }

    if !key.chars().all(|c| KVSTORE_KEY_ALPHABET.contains(c)) {
        return Err(Error::KVStoreInvalidKey("key contains invalid characters. Only ASCII letters, numbers, underscore, and hyphen are allowed".to_string()));
    }

    Ok(())
}

/// Key-Value Store
#[async_trait]
pub trait KVStore: Debug + Send + Sync {
    /// Read value from key-value store
    async fn kv_read(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Write value to key-value store
    async fn kv_write(&self, key: &str, value: &[u8]) -> Result<(), Error>;

    /// Remove value from key-value store
    async fn kv_remove(&self, key: &str) -> Result<(), Error>;
}

/// Read and deserialize a JSON value
pub async fn read_json<T>(store: &dyn KVStore, key: &str) -> Result<Option<T>, Error>
where
    T: DeserializeOwned,
{
    match store.kv_read(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Serialize and write a JSON value
pub async fn write_json<T>(store: &dyn KVStore, key: &str, value: &T) -> Result<(), Error>
where
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec(value)?;
    store.kv_write(key, &bytes).await
}

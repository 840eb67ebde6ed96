//! In-memory KV store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{validate_kvstore_key, Error, KVStore};

/// In-memory KV store
#[derive(Debug, Clone, Default)]
pub struct MemoryKVStore {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

#[async_trait]
impl KVStore for MemoryKVStore {
    async fn kv_read(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        validate_kvstore_key(key)?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn kv_write(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        validate_kvstore_key(key)?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn kv_remove(&self, key: &str) -> Result<(), Error> {
        validate_kvstore_key(key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }
}

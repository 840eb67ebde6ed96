//! File backed KV store
//!
//! One file per key inside a directory. Writes go to a temporary file first
//! and are renamed into place so a crash never leaves a half written blob.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{validate_kvstore_key, Error, KVStore};

/// File backed KV store
#[derive(Debug, Clone)]
pub struct FileKVStore {
    dir: PathBuf,
}

impl FileKVStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub async fn new<P: Into<PathBuf>>(dir: P) -> Result<Self, Error> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Directory holding the blobs
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KVStore for FileKVStore {
    async fn kv_read(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        validate_kvstore_key(key)?;
        match fs::read(self.key_path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn kv_write(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        validate_kvstore_key(key)?;
        let path = self.key_path(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));

        let mut file = fs::File::create(&tmp).await?;
        file.write_all(value).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn kv_remove(&self, key: &str) -> Result<(), Error> {
        validate_kvstore_key(key)?;
        match fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

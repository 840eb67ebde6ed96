//! Unspent proof set
//!
//! Writers are serialized behind one lock and every write bumps an
//! in-process version. [`ProofStore::replace`] takes the version observed at
//! [`ProofStore::snapshot`] time and rejects the write if anyone else wrote
//! in between, so a slow writer can never clobber proofs it did not see.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::instrument;

use crate::amount::Amount;
use crate::database::{self, KVStore, PROOFS_KEY};
use crate::error::Error;
use crate::types::{ensure_unique_secrets, proofs_total, Proofs};

/// Proofs together with the store version they were read at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofSnapshot {
    /// Store version
    pub version: u64,
    /// Proofs
    pub proofs: Proofs,
}

/// Persisted set of unspent proofs
#[derive(Debug)]
pub struct ProofStore {
    localstore: Arc<dyn KVStore>,
    version: Mutex<u64>,
}

impl ProofStore {
    /// Create new [`ProofStore`]
    pub fn new(localstore: Arc<dyn KVStore>) -> Self {
        Self {
            localstore,
            version: Mutex::new(0),
        }
    }

    /// Load all proofs
    pub async fn load(&self) -> Result<Proofs, Error> {
        let _guard = self.version.lock().await;
        self.read().await
    }

    /// Load all proofs with the current version
    pub async fn snapshot(&self) -> Result<ProofSnapshot, Error> {
        let version = self.version.lock().await;
        Ok(ProofSnapshot {
            version: *version,
            proofs: self.read().await?,
        })
    }

    /// Overwrite the proof set
    ///
    /// Fails with [`Error::ConcurrentUpdate`] when the store moved past
    /// `expected_version`. Returns the new version.
    #[instrument(skip(self, proofs))]
    pub async fn replace(&self, expected_version: u64, proofs: Proofs) -> Result<u64, Error> {
        let mut version = self.version.lock().await;
        if *version != expected_version {
            tracing::warn!(
                "Rejecting stale proof set write: expected version {}, store at {}",
                expected_version,
                *version
            );
            return Err(Error::ConcurrentUpdate);
        }

        ensure_unique_secrets(&proofs)?;
        database::write_json(self.localstore.as_ref(), PROOFS_KEY, &proofs).await?;
        *version += 1;

        tracing::debug!("Proof set replaced with {} proofs", proofs.len());
        Ok(*version)
    }

    /// Add proofs to the set
    ///
    /// Read-modify-write under the writer lock. A secret that is already
    /// held, or repeated within `proofs`, rejects the whole batch and leaves
    /// the store unchanged. Returns the new total.
    #[instrument(skip(self, proofs))]
    pub async fn append(&self, proofs: Proofs) -> Result<Amount, Error> {
        let mut version = self.version.lock().await;
        let mut current = self.read().await?;

        ensure_unique_secrets(&proofs)?;
        if let Some(duplicate) = proofs
            .iter()
            .find(|new| current.iter().any(|held| held.secret == new.secret))
        {
            tracing::warn!("Refusing to append already held proof");
            return Err(Error::DuplicateProof(duplicate.secret.clone()));
        }

        let added = proofs.len();
        current.extend(proofs);
        let total = proofs_total(&current)?;

        database::write_json(self.localstore.as_ref(), PROOFS_KEY, &current).await?;
        *version += 1;

        tracing::debug!("Appended {} proofs, balance now {}", added, total);
        Ok(total)
    }

    /// Sum of all held proofs
    pub async fn sum(&self) -> Result<Amount, Error> {
        proofs_total(&self.load().await?)
    }

    /// Whether the store holds no proofs
    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.load().await?.is_empty())
    }

    async fn read(&self) -> Result<Proofs, Error> {
        Ok(database::read_json(self.localstore.as_ref(), PROOFS_KEY)
            .await?
            .unwrap_or_default())
    }
}

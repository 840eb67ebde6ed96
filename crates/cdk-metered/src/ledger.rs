//! Transaction ledger
//!
//! Append-only log of monetary events. Records are never mutated or
//! reordered once written.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use web_time::{SystemTime, UNIX_EPOCH};

use crate::amount::Amount;
use crate::database::{self, KVStore, TRANSACTIONS_KEY};
use crate::error::Error;

/// Milliseconds since unix epoch
pub fn unix_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Kind of monetary event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Paid request to the node
    Spent,
    /// Proofs issued for a paid mint quote
    Mint,
    /// Token exported
    Send,
    /// Token imported
    Import,
    /// Remainder reclaimed from the node
    Refund,
    /// Token wrapped for a recipient
    GiftSent,
    /// Gift wrap unwrapped and imported
    GiftReceived,
}

/// Outcome of a monetary event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Completed
    Success,
    /// Failed
    Failed,
}

/// Ledger record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Kind
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Amount in sats
    pub amount: Amount,
    /// Milliseconds since unix epoch
    pub timestamp: u64,
    /// Status
    pub status: TransactionStatus,
    /// Model used for a paid request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Free form message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Wallet balance after the event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Amount>,
}

impl TransactionRecord {
    /// Successful record stamped with the current time
    pub fn success(kind: TransactionKind, amount: Amount) -> Self {
        Self {
            kind,
            amount,
            timestamp: unix_time_ms(),
            status: TransactionStatus::Success,
            model: None,
            message: None,
            balance: None,
        }
    }

    /// Failed record stamped with the current time
    pub fn failed(kind: TransactionKind, amount: Amount, message: impl Into<String>) -> Self {
        Self {
            status: TransactionStatus::Failed,
            message: Some(message.into()),
            ..Self::success(kind, amount)
        }
    }

    /// Set model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set resulting balance
    pub fn with_balance(mut self, balance: Amount) -> Self {
        self.balance = Some(balance);
        self
    }
}

/// Append-only transaction log
#[derive(Debug)]
pub struct TransactionLedger {
    localstore: Arc<dyn KVStore>,
    lock: Mutex<()>,
}

impl TransactionLedger {
    /// Create new [`TransactionLedger`]
    pub fn new(localstore: Arc<dyn KVStore>) -> Self {
        Self {
            localstore,
            lock: Mutex::new(()),
        }
    }

    /// Append a record
    pub async fn append(&self, record: TransactionRecord) -> Result<(), Error> {
        let _guard = self.lock.lock().await;
        let mut records = self.read().await?;
        tracing::debug!(
            "Recording {:?} of {} sats ({:?})",
            record.kind,
            record.amount,
            record.status
        );
        records.push(record);
        database::write_json(self.localstore.as_ref(), TRANSACTIONS_KEY, &records).await?;
        Ok(())
    }

    /// All records in insertion order
    pub async fn list(&self) -> Result<Vec<TransactionRecord>, Error> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Records of one kind in insertion order
    pub async fn list_kind(&self, kind: TransactionKind) -> Result<Vec<TransactionRecord>, Error> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|record| record.kind == kind)
            .collect())
    }

    /// Number of records
    pub async fn len(&self) -> Result<usize, Error> {
        Ok(self.list().await?.len())
    }

    /// Whether the ledger is empty
    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }

    async fn read(&self) -> Result<Vec<TransactionRecord>, Error> {
        Ok(database::read_json(self.localstore.as_ref(), TRANSACTIONS_KEY)
            .await?
            .unwrap_or_default())
    }
}

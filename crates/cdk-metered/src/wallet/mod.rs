//! Metered wallet
//!
//! [`MeteredWallet`] owns the proof store, the active bearer token, the
//! ledger and the sent gift wraps, and exposes every wallet operation.
//! Operations that touch proofs or the bearer token run one at a time behind
//! a single operation lock.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::active_token::ActiveTokenSlot;
use crate::amount::Amount;
use crate::config::{Settings, StorageBackend};
use crate::database::{FileKVStore, KVStore, MemoryKVStore};
use crate::error::Error;
use crate::ledger::{TransactionKind, TransactionLedger, TransactionRecord};
use crate::mint_connector::MintClient;
use crate::node::{HttpClient, NodeConnector};
use crate::nostr::{GiftStore, Identity};
use crate::proof_store::ProofStore;
use crate::types::{NodeInfo, Proofs};

mod balance;
mod gift;
mod quotes;
mod receive;
mod refund;
mod request;
mod send;
#[cfg(test)]
pub(crate) mod test_utils;

pub use self::gift::ReceivedGift;

/// Pay-per-request wallet
#[derive(Debug)]
pub struct MeteredWallet {
    /// Mint url
    pub mint_url: String,
    /// Unit
    pub unit: String,
    /// Reclaim the node remainder after every paid request
    pub refund_after_request: bool,
    /// Storage backend
    pub localstore: Arc<dyn KVStore>,
    proofs: ProofStore,
    active_token: ActiveTokenSlot,
    ledger: TransactionLedger,
    gifts: GiftStore,
    mint: Arc<dyn MintClient>,
    node: Arc<dyn NodeConnector>,
    identity: Option<Arc<dyn Identity>>,
    node_info: RwLock<Option<NodeInfo>>,
    op_lock: Mutex<()>,
}

impl MeteredWallet {
    /// Unspent proofs
    pub fn proof_store(&self) -> &ProofStore {
        &self.proofs
    }

    /// Bearer token slot
    pub fn active_token(&self) -> &ActiveTokenSlot {
        &self.active_token
    }

    /// Transaction ledger
    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    /// Nostr identity used for gifts
    pub fn identity(&self) -> Option<&Arc<dyn Identity>> {
        self.identity.as_ref()
    }

    /// All ledger records, oldest first
    pub async fn transactions(&self) -> Result<Vec<TransactionRecord>, Error> {
        self.ledger.list().await
    }

    fn require_identity(&self) -> Result<&Arc<dyn Identity>, Error> {
        self.identity
            .as_ref()
            .ok_or_else(|| Error::Validation("Wallet has no nostr identity".to_string()))
    }

    /// Record a ledger entry without failing the operation it describes
    async fn record(&self, record: TransactionRecord) {
        if let Err(err) = self.ledger.append(record).await {
            tracing::error!("Could not write ledger record: {}", err);
        }
    }

    /// Keep proofs the mint already issued recoverable after a local failure
    ///
    /// Writes a failed ledger record whose message ends with the proofs
    /// encoded as a token, so they can be imported again.
    async fn record_unsaved(
        &self,
        kind: TransactionKind,
        amount: Amount,
        err: &Error,
        proofs: Proofs,
    ) {
        let token = match self.encode_token(proofs, None) {
            Ok(token) => token,
            Err(encode_err) => {
                tracing::error!("Could not encode unsaved proofs: {}", encode_err);
                return;
            }
        };
        self.record_unsaved_token(kind, amount, err, &token).await;
    }

    async fn record_unsaved_token(
        &self,
        kind: TransactionKind,
        amount: Amount,
        err: &Error,
        token: &str,
    ) {
        tracing::error!("{} sats left outside the proof store: {}", amount, err);
        self.record(TransactionRecord::failed(
            kind,
            amount,
            format!("{err}; {UNSAVED_PROOFS_MARKER}{token}"),
        ))
        .await;
    }
}

/// Prefix of the recovery token in a failed ledger record message
pub const UNSAVED_PROOFS_MARKER: &str = "unsaved proofs: ";

/// Builder for creating a new [`MeteredWallet`]
#[derive(Debug, Default)]
pub struct WalletBuilder {
    mint_url: Option<String>,
    unit: Option<String>,
    node_url: Option<String>,
    refund_after_request: Option<bool>,
    localstore: Option<Arc<dyn KVStore>>,
    mint: Option<Arc<dyn MintClient>>,
    node: Option<Arc<dyn NodeConnector>>,
    identity: Option<Arc<dyn Identity>>,
}

impl WalletBuilder {
    /// Create a new WalletBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded from [`Settings`]
    ///
    /// Opens the configured storage backend. The mint client and identity
    /// still have to be supplied.
    pub async fn from_settings(settings: &Settings) -> Result<Self, Error> {
        settings.validate()?;

        let localstore: Arc<dyn KVStore> = match settings.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryKVStore::default()),
            StorageBackend::File => {
                let path = settings.storage_path().ok_or_else(|| {
                    Error::Validation("File storage needs a path".to_string())
                })?;
                Arc::new(FileKVStore::new(path).await?)
            }
        };

        Ok(Self::new()
            .mint_url(&settings.mint_url)
            .unit(&settings.unit)
            .node_url(&settings.node_url)
            .refund_after_request(settings.refund_after_request)
            .localstore(localstore))
    }

    /// Set the mint url
    pub fn mint_url(mut self, mint_url: &str) -> Self {
        self.mint_url = Some(mint_url.trim().to_string());
        self
    }

    /// Set the unit
    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    /// Node url, used to build an [`HttpClient`] when no connector is set
    pub fn node_url(mut self, node_url: &str) -> Self {
        self.node_url = Some(node_url.to_string());
        self
    }

    /// Set whether paid requests refund afterwards
    pub fn refund_after_request(mut self, refund_after_request: bool) -> Self {
        self.refund_after_request = Some(refund_after_request);
        self
    }

    /// Set the storage backend
    pub fn localstore(mut self, localstore: Arc<dyn KVStore>) -> Self {
        self.localstore = Some(localstore);
        self
    }

    /// Set the mint client
    pub fn mint_client(mut self, mint: Arc<dyn MintClient>) -> Self {
        self.mint = Some(mint);
        self
    }

    /// Set a custom node connector
    pub fn node(mut self, node: Arc<dyn NodeConnector>) -> Self {
        self.node = Some(node);
        self
    }

    /// Set the nostr identity
    pub fn identity(mut self, identity: Arc<dyn Identity>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Build the wallet
    pub fn build(self) -> Result<MeteredWallet, Error> {
        let mint_url = self
            .mint_url
            .filter(|url| !url.is_empty())
            .ok_or(Error::Validation("Mint url required".to_string()))?;
        let mint = self
            .mint
            .ok_or(Error::Validation("Mint client required".to_string()))?;

        let node = match self.node {
            Some(node) => node,
            None => {
                let node_url = self
                    .node_url
                    .ok_or(Error::Validation("Node url required".to_string()))?;
                Arc::new(HttpClient::new(&node_url)?) as Arc<dyn NodeConnector>
            }
        };

        let localstore = self
            .localstore
            .unwrap_or_else(|| Arc::new(MemoryKVStore::default()));

        Ok(MeteredWallet {
            mint_url,
            unit: self.unit.unwrap_or_else(|| "sat".to_string()),
            refund_after_request: self.refund_after_request.unwrap_or(true),
            proofs: ProofStore::new(localstore.clone()),
            active_token: ActiveTokenSlot::new(localstore.clone()),
            ledger: TransactionLedger::new(localstore.clone()),
            gifts: GiftStore::new(localstore.clone()),
            localstore,
            mint,
            node,
            identity: self.identity,
            node_info: RwLock::new(None),
            op_lock: Mutex::new(()),
        })
    }
}

//! Wallet types

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::Error;

/// Ecash proof
///
/// Cryptographic validity is the mint's concern; the wallet only tracks
/// amount and secret uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proof {
    /// Amount in sats
    pub amount: Amount,
    /// Mint keyset id
    #[serde(rename = "id")]
    pub keyset_id: String,
    /// Secret, unique per proof
    pub secret: String,
    /// Unblinded signature
    #[serde(rename = "C", alias = "signature")]
    pub c: String,
}

/// List of [`Proof`]
pub type Proofs = Vec<Proof>;

/// Sum of proof amounts
pub fn proofs_total(proofs: &[Proof]) -> Result<Amount, Error> {
    Amount::try_sum(proofs.iter().map(|p| p.amount))
}

/// Reject any secret repeated inside `proofs`
pub fn ensure_unique_secrets(proofs: &[Proof]) -> Result<(), Error> {
    let mut seen = HashSet::with_capacity(proofs.len());
    for proof in proofs {
        if !seen.insert(proof.secret.as_str()) {
            return Err(Error::DuplicateProof(proof.secret.clone()));
        }
    }
    Ok(())
}

/// Proofs returned by a mint split
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendSplit {
    /// Proofs handed over as the bearer token
    pub outgoing: Proofs,
    /// Proofs kept by the wallet
    pub change: Proofs,
}

/// Wallet balance in sats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Sum of locally held proofs
    pub proofs_balance: Amount,
    /// Balance observed on the node for the active token
    pub remote_balance: Amount,
    /// Total spendable
    pub total: Amount,
}

/// Result of asking for a bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenResult {
    /// The cached active token
    Cached(String),
    /// A freshly minted token, now active
    Minted(String),
    /// The proof store is empty
    NoFunds,
    /// The mint could not cover the requested amount
    InsufficientFunds,
}

impl TokenResult {
    /// Token string, if one is available
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Cached(token) | Self::Minted(token) => Some(token),
            Self::NoFunds | Self::InsufficientFunds => None,
        }
    }
}

/// Result of a refund
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundOutcome {
    /// No active token was cached
    NothingToRefund,
    /// The active token was released; `amount` sats came back from the node
    Refunded {
        /// Sats recovered into the proof store
        amount: Amount,
    },
}

/// Mint quote state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MintQuoteState {
    /// Invoice not paid
    Unpaid,
    /// Invoice paid, proofs not yet issued
    Paid,
    /// Proofs issued
    Issued,
}

/// Lightning funded mint quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintQuote {
    /// Quote id
    #[serde(rename = "quote")]
    pub id: String,
    /// Lightning payment request
    #[serde(rename = "request")]
    pub invoice: String,
    /// Amount in sats
    #[serde(default)]
    pub amount: Option<Amount>,
    /// State
    pub state: MintQuoteState,
}

/// Paid status of a mint quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteStatus {
    /// Invoice is paid
    pub paid: bool,
}

impl From<MintQuoteState> for QuoteStatus {
    fn from(state: MintQuoteState) -> Self {
        Self {
            paid: state == MintQuoteState::Paid,
        }
    }
}

/// Node descriptor served at the node base URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Node name
    pub name: String,
    /// Node version
    pub version: String,
    /// Node operator npub
    #[serde(default)]
    pub npub: Option<String>,
    /// Mint accepted by the node
    #[serde(default)]
    pub mint: Option<String>,
    /// Models served
    #[serde(default)]
    pub models: Vec<Model>,
}

impl NodeInfo {
    /// Model by id
    pub fn model(&self, id: &str) -> Option<&Model> {
        self.models.iter().find(|model| model.id == id)
    }
}

/// Model served by the node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Model id
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Pricing in sats
    #[serde(default)]
    pub sats_pricing: Option<SatsPricing>,
}

impl Model {
    /// Upper bound on the price of one request, rounded up to whole sats
    pub fn max_cost(&self) -> Result<Amount, Error> {
        let pricing = self
            .sats_pricing
            .as_ref()
            .ok_or_else(|| Error::InvalidModel(format!("{} has no pricing", self.id)))?;
        Amount::from_sats_ceil(pricing.max_cost)
    }
}

/// Model pricing in sats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatsPricing {
    /// Price per prompt token
    #[serde(default)]
    pub prompt: f64,
    /// Price per completion token
    #[serde(default)]
    pub completion: f64,
    /// Maximum cost of one request
    pub max_cost: f64,
}

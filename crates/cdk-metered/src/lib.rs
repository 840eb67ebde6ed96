//! Pay-per-request ecash wallet for metered APIs
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod active_token;
pub mod amount;
pub mod config;
pub mod database;
pub mod error;
pub mod ledger;
pub mod mint_connector;
pub mod node;
pub mod nostr;
pub mod proof_store;
pub mod token;
pub mod types;
pub mod wallet;

pub use self::active_token::{ActiveTokenSlot, ReleaseReason, TokenState};
pub use self::amount::Amount;
pub use self::config::Settings;
pub use self::error::Error;
pub use self::ledger::{TransactionKind, TransactionLedger, TransactionRecord, TransactionStatus};
pub use self::mint_connector::MintClient;
pub use self::node::{HttpClient, NodeConnector};
pub use self::nostr::{GiftWrap, Identity};
pub use self::proof_store::ProofStore;
pub use self::token::Token;
pub use self::types::{
    Balance, MintQuote, MintQuoteState, NodeInfo, Proof, Proofs, QuoteStatus, RefundOutcome,
    SendSplit, TokenResult,
};
pub use self::wallet::{MeteredWallet, ReceivedGift, WalletBuilder};

//! Mint client
//!
//! The blind signature protocol is owned by the mint. The wallet only needs
//! the operations below; implementations wrap whatever mint SDK is in use.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::amount::Amount;
use crate::error::Error;
use crate::types::{MintQuote, Proofs, SendSplit};

/// Interface that connects the wallet to a mint
#[async_trait]
pub trait MintClient: Debug + Send + Sync {
    /// Split `proofs` into outgoing proofs worth at least `amount` and change
    ///
    /// Must fail with [`Error::InsufficientFunds`] when `proofs` cannot cover
    /// `amount`, and must not have spent anything in that case.
    async fn send(&self, amount: Amount, proofs: Proofs) -> Result<SendSplit, Error>;

    /// Redeem a token, returning fresh proofs owned by the wallet
    ///
    /// Must fail with [`Error::TokenAlreadySpent`] when the token's proofs
    /// were already redeemed.
    async fn receive(&self, token: &str) -> Result<Proofs, Error>;

    /// Request a Lightning invoice for minting `amount`
    async fn create_quote(&self, amount: Amount) -> Result<MintQuote, Error>;

    /// Current state of a mint quote
    async fn check_quote(&self, quote_id: &str) -> Result<MintQuote, Error>;

    /// Issue proofs for a paid quote
    async fn mint(&self, quote_id: &str) -> Result<Proofs, Error>;
}

use tracing::instrument;

use crate::amount::Amount;
use crate::error::Error;
use crate::ledger::{TransactionKind, TransactionRecord};
use crate::token::Token;
use crate::types::{proofs_total, Proofs, TokenResult};
use crate::wallet::MeteredWallet;

impl MeteredWallet {
    /// Bearer token worth at least `amount` sats
    ///
    /// Returns the cached active token unchanged while one exists, so
    /// repeated calls never split proofs again. Fractional amounts round up.
    #[instrument(skip(self))]
    pub async fn get_or_create_token(&self, amount: f64) -> Result<TokenResult, Error> {
        let amount = Amount::from_sats_ceil(amount)?;
        let _guard = self.op_lock.lock().await;
        self.get_or_create_token_locked(amount).await
    }

    pub(super) async fn get_or_create_token_locked(
        &self,
        amount: Amount,
    ) -> Result<TokenResult, Error> {
        if let Some(token) = self.active_token.current().await? {
            tracing::debug!("Reusing active bearer token");
            return Ok(TokenResult::Cached(token));
        }

        if self.proofs.is_empty().await? {
            return Ok(TokenResult::NoFunds);
        }

        Ok(match self.generate_token_locked(amount).await? {
            Some(token) => TokenResult::Minted(token),
            None => TokenResult::InsufficientFunds,
        })
    }

    /// Split held proofs into a new active bearer token
    ///
    /// Returns `None`, with the proof store untouched, when the mint reports
    /// the proofs cannot cover `amount`.
    #[instrument(skip(self))]
    pub async fn generate_token(&self, amount: f64) -> Result<Option<String>, Error> {
        let amount = Amount::from_sats_ceil(amount)?;
        let _guard = self.op_lock.lock().await;
        self.generate_token_locked(amount).await
    }

    async fn generate_token_locked(&self, amount: Amount) -> Result<Option<String>, Error> {
        if self.active_token.current().await?.is_some() {
            return Err(Error::TokenAlreadyActive);
        }

        let Some(outgoing) = self.split_proofs(amount).await? else {
            return Ok(None);
        };

        let token = self.encode_token(outgoing, None)?;
        if let Err(err) = self.active_token.activate(token.clone()).await {
            self.record_unsaved_token(TransactionKind::Send, amount, &err, &token)
                .await;
            return Err(err);
        }
        tracing::debug!("Created bearer token for {} sats", amount);
        Ok(Some(token))
    }

    /// Export a standalone token worth `amount` sats
    ///
    /// The token is not used as the bearer token.
    #[instrument(skip(self, memo))]
    pub async fn send_token(&self, amount: Amount, memo: Option<String>) -> Result<String, Error> {
        let _guard = self.op_lock.lock().await;
        let token = self.send_token_locked(amount, memo).await?;

        let balance = self.proofs.sum().await?;
        self.record(TransactionRecord::success(TransactionKind::Send, amount).with_balance(balance))
            .await;
        Ok(token)
    }

    pub(super) async fn send_token_locked(
        &self,
        amount: Amount,
        memo: Option<String>,
    ) -> Result<String, Error> {
        match self.split_proofs(amount).await? {
            Some(outgoing) => self.encode_token(outgoing, memo),
            None => Err(Error::InsufficientBalance {
                required: amount,
                available: self.proofs.sum().await?,
            }),
        }
    }

    /// Ask the mint to split all held proofs, keeping the change
    ///
    /// The change replaces the proof set only if nobody wrote to it since
    /// the snapshot.
    async fn split_proofs(&self, amount: Amount) -> Result<Option<Proofs>, Error> {
        if amount.is_zero() {
            return Err(Error::Validation("Amount must be positive".to_string()));
        }

        let snapshot = self.proofs.snapshot().await?;
        let split = match self.mint.send(amount, snapshot.proofs).await {
            Ok(split) => split,
            Err(Error::InsufficientFunds) => {
                tracing::debug!("Mint cannot cover {} sats", amount);
                return Ok(None);
            }
            Err(err) => {
                tracing::warn!("Mint split failed: {}", err);
                return Err(Error::TokenGeneration(err.to_string()));
            }
        };

        let outgoing_total = proofs_total(&split.outgoing)?;
        if outgoing_total < amount {
            tracing::warn!(
                "Mint returned {} sats of outgoing proofs for {} requested",
                outgoing_total,
                amount
            );
        }

        if let Err(err) = self
            .proofs
            .replace(snapshot.version, split.change.clone())
            .await
        {
            // The inputs are spent at the mint. Keep both halves recoverable.
            let mut unsaved = split.change;
            unsaved.extend(split.outgoing);
            let unsaved_total = proofs_total(&unsaved)?;
            self.record_unsaved(TransactionKind::Send, unsaved_total, &err, unsaved)
                .await;
            return Err(err);
        }

        Ok(Some(split.outgoing))
    }

    pub(super) fn encode_token(
        &self,
        proofs: Proofs,
        memo: Option<String>,
    ) -> Result<String, Error> {
        Ok(Token::new(&self.mint_url, proofs, memo, Some(self.unit.clone()))?.to_string())
    }
}

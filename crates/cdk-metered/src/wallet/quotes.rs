use tracing::instrument;

use crate::amount::Amount;
use crate::error::Error;
use crate::ledger::{TransactionKind, TransactionRecord};
use crate::types::{MintQuote, MintQuoteState, QuoteStatus};
use crate::wallet::MeteredWallet;

impl MeteredWallet {
    /// Request a Lightning invoice for minting `amount` sats
    #[instrument(skip(self))]
    pub async fn create_mint_quote(&self, amount: Amount) -> Result<MintQuote, Error> {
        if amount.is_zero() {
            return Err(Error::Validation("Amount must be positive".to_string()));
        }
        let quote = self.mint.create_quote(amount).await?;
        tracing::debug!("Created mint quote {}", quote.id);
        Ok(quote)
    }

    /// Whether the quote's invoice has been paid
    #[instrument(skip(self))]
    pub async fn check_mint_quote(&self, quote_id: &str) -> Result<QuoteStatus, Error> {
        let quote = self.mint.check_quote(quote_id).await?;
        Ok(quote.state.into())
    }

    /// Issue proofs for a paid quote and keep them
    ///
    /// Checking a quote never issues proofs; this is the explicit follow-up.
    /// Fails with [`Error::QuoteNotPaid`] until the invoice is paid.
    #[instrument(skip(self))]
    pub async fn redeem_mint_quote(&self, quote_id: &str) -> Result<Amount, Error> {
        let _guard = self.op_lock.lock().await;

        let quote = self.mint.check_quote(quote_id).await?;
        match quote.state {
            MintQuoteState::Paid => (),
            MintQuoteState::Unpaid => return Err(Error::QuoteNotPaid(quote_id.to_string())),
            MintQuoteState::Issued => {
                return Err(Error::Validation(format!(
                    "Quote {quote_id} was already issued"
                )))
            }
        }

        let proofs = self.mint.mint(quote_id).await?;
        let amount = self.store_received(proofs, TransactionKind::Mint).await?;

        let balance = self.proofs.sum().await?;
        self.record(
            TransactionRecord::success(TransactionKind::Mint, amount)
                .with_balance(balance)
                .with_message(quote_id),
        )
        .await;

        tracing::info!("Minted {} sats from quote {}", amount, quote_id);
        Ok(amount)
    }
}

use tracing::instrument;

use crate::amount::Amount;
use crate::error::Error;
use crate::ledger::{TransactionKind, TransactionRecord};
use crate::token::{ensure_cashu_token, token_value};
use crate::types::{proofs_total, Proofs};
use crate::wallet::MeteredWallet;

impl MeteredWallet {
    /// Redeem a token at the mint and keep the fresh proofs
    ///
    /// Returns the amount received. A spent or duplicate token fails without
    /// changing the proof set.
    #[instrument(skip_all)]
    pub async fn import_token(&self, token: &str) -> Result<Amount, Error> {
        let _guard = self.op_lock.lock().await;
        self.import_locked(token, TransactionKind::Import).await
    }

    pub(super) async fn import_locked(
        &self,
        token: &str,
        kind: TransactionKind,
    ) -> Result<Amount, Error> {
        let proofs = match self.redeem(token).await {
            Ok(proofs) => proofs,
            Err(err) => {
                tracing::warn!("Token import failed: {}", err);
                self.record(TransactionRecord::failed(
                    kind,
                    token_value(token).unwrap_or_default(),
                    err.to_string(),
                ))
                .await;
                return Err(err);
            }
        };

        let amount = self.store_received(proofs, kind).await?;
        let balance = self.proofs.sum().await?;
        self.record(TransactionRecord::success(kind, amount).with_balance(balance))
            .await;
        tracing::debug!("Imported {} sats", amount);
        Ok(amount)
    }

    /// Swap a token for fresh proofs at the mint
    pub(super) async fn redeem(&self, token: &str) -> Result<Proofs, Error> {
        let token = token.trim();
        ensure_cashu_token(token)?;
        self.mint.receive(token).await
    }

    /// Append proofs the mint just issued
    ///
    /// The proofs are already valid at the mint, so a storage failure leaves
    /// them in a failed `kind` ledger record as a token.
    pub(super) async fn store_received(
        &self,
        proofs: Proofs,
        kind: TransactionKind,
    ) -> Result<Amount, Error> {
        let amount = proofs_total(&proofs)?;
        if let Err(err) = self.proofs.append(proofs.clone()).await {
            self.record_unsaved(kind, amount, &err, proofs).await;
            return Err(err);
        }
        Ok(amount)
    }
}

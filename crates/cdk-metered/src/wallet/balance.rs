use tracing::instrument;

use crate::active_token::ReleaseReason;
use crate::amount::Amount;
use crate::error::Error;
use crate::types::Balance;
use crate::wallet::MeteredWallet;

impl MeteredWallet {
    /// Wallet balance
    ///
    /// Any balance the node holds for the active token is refunded into the
    /// proof store before returning, and reported as the remote part. Remote
    /// failures never fail the call: they count as zero, so the total can
    /// undercount but never overcount. Only local storage errors propagate.
    #[instrument(skip(self))]
    pub async fn get_balance(&self) -> Result<Balance, Error> {
        let _guard = self.op_lock.lock().await;

        let proofs_balance = self.proofs.sum().await?;
        let remote_balance = self.reconcile_remote_balance().await?;
        let total = proofs_balance
            .checked_add(remote_balance)
            .ok_or(Error::AmountOverflow)?;

        Ok(Balance {
            proofs_balance,
            remote_balance,
            total,
        })
    }

    async fn reconcile_remote_balance(&self) -> Result<Amount, Error> {
        let Some(token) = self.active_token.current().await? else {
            return Ok(Amount::ZERO);
        };

        match self.node.get_wallet_balance(&token).await {
            Ok(0) => Ok(Amount::ZERO),
            Ok(msat) => {
                let observed = Amount::from_msat(msat);
                if let Err(err) = self.refund_locked().await {
                    tracing::warn!("Could not reclaim {} msat from node: {}", msat, err);
                }
                Ok(observed)
            }
            Err(Error::PaymentRequired(_)) => {
                tracing::debug!("Bearer token exhausted, invalidating");
                self.active_token.release(ReleaseReason::Invalidated).await?;
                Ok(Amount::ZERO)
            }
            Err(err) if err.is_auth_rejection() => {
                tracing::warn!("Node rejected bearer token: {}", err);
                self.active_token.release(ReleaseReason::Invalidated).await?;
                Ok(Amount::ZERO)
            }
            Err(err) => {
                tracing::warn!("Could not query node balance: {}", err);
                Ok(Amount::ZERO)
            }
        }
    }
}

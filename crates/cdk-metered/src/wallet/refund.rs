use tracing::instrument;

use crate::active_token::ReleaseReason;
use crate::amount::Amount;
use crate::error::Error;
use crate::ledger::{TransactionKind, TransactionRecord};
use crate::token::token_value;
use crate::types::RefundOutcome;
use crate::wallet::MeteredWallet;

impl MeteredWallet {
    /// Reclaim the node's remainder of the active bearer token
    ///
    /// A no-op when no token is active. On a transport failure the token is
    /// kept, since the node still holds its funds and a later refund can
    /// claim them.
    #[instrument(skip(self))]
    pub async fn refund(&self) -> Result<RefundOutcome, Error> {
        let _guard = self.op_lock.lock().await;
        self.refund_locked().await
    }

    pub(super) async fn refund_locked(&self) -> Result<RefundOutcome, Error> {
        let Some(token) = self.active_token.current().await? else {
            return Ok(RefundOutcome::NothingToRefund);
        };

        let response = match self.node.post_refund(&token).await {
            Ok(response) => response,
            Err(Error::PaymentRequired(message)) => {
                tracing::debug!("Bearer token exhausted: {}", message);
                self.active_token.release(ReleaseReason::Invalidated).await?;
                return Ok(RefundOutcome::Refunded {
                    amount: Amount::ZERO,
                });
            }
            Err(err) if err.is_auth_rejection() => {
                self.active_token.release(ReleaseReason::Invalidated).await?;
                return Err(err);
            }
            Err(err) => {
                tracing::warn!("Refund failed, keeping active token: {}", err);
                return Err(err);
            }
        };

        let mut amount = Amount::ZERO;
        if let Some(refund_token) = response.token.filter(|token| !token.trim().is_empty()) {
            let proofs = match self.redeem(&refund_token).await {
                Ok(proofs) => proofs,
                Err(err) => {
                    // The node already released the funds into `refund_token`
                    tracing::error!("Could not redeem refund token: {}", err);
                    self.record_unsaved_token(
                        TransactionKind::Refund,
                        token_value(&refund_token).unwrap_or_default(),
                        &err,
                        &refund_token,
                    )
                    .await;
                    self.active_token.release(ReleaseReason::Refunded).await?;
                    return Err(err);
                }
            };

            match self.store_received(proofs, TransactionKind::Refund).await {
                Ok(received) => {
                    amount = received;
                    let balance = self.proofs.sum().await?;
                    self.record(
                        TransactionRecord::success(TransactionKind::Refund, received)
                            .with_balance(balance),
                    )
                    .await;
                }
                Err(err) => {
                    self.active_token.release(ReleaseReason::Refunded).await?;
                    return Err(err);
                }
            }
        }

        self.active_token.release(ReleaseReason::Refunded).await?;
        tracing::debug!("Refunded {} sats", amount);
        Ok(RefundOutcome::Refunded { amount })
    }

    /// Drop the active bearer token without contacting the node
    ///
    /// Returns the dropped token. Any funds the node still holds for it are
    /// no longer tracked.
    #[instrument(skip(self))]
    pub async fn invalidate_token(&self) -> Result<Option<String>, Error> {
        let _guard = self.op_lock.lock().await;
        self.active_token.release(ReleaseReason::Invalidated).await
    }
}

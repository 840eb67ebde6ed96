use serde_json::Value;
use tracing::instrument;

use crate::active_token::ReleaseReason;
use crate::amount::Amount;
use crate::error::Error;
use crate::ledger::{TransactionKind, TransactionRecord};
use crate::token::token_value;
use crate::types::{Model, NodeInfo, RefundOutcome, TokenResult};
use crate::wallet::MeteredWallet;

impl MeteredWallet {
    /// Fetch the node descriptor and cache its models
    #[instrument(skip(self))]
    pub async fn node_info(&self) -> Result<NodeInfo, Error> {
        let info = self.node.get_node_info().await?;
        *self.node_info.write().await = Some(info.clone());
        Ok(info)
    }

    /// Model by id, from the cached descriptor when present
    pub async fn model(&self, model_id: &str) -> Result<Model, Error> {
        if let Some(model) = self
            .node_info
            .read()
            .await
            .as_ref()
            .and_then(|info| info.model(model_id))
        {
            return Ok(model.clone());
        }

        self.node_info()
            .await?
            .model(model_id)
            .cloned()
            .ok_or_else(|| Error::InvalidModel(model_id.to_string()))
    }

    /// Paid, non-streaming chat completion
    ///
    /// Checks the local balance against the model's max cost, presents the
    /// bearer token with `body` and, when `refund_after_request` is set,
    /// reclaims the unspent remainder afterwards. One paid request runs at a
    /// time per wallet.
    #[instrument(skip(self, body))]
    pub async fn paid_request(&self, model_id: &str, body: &Value) -> Result<Value, Error> {
        let model = self.model(model_id).await?;
        let max_cost = model.max_cost()?;

        let _guard = self.op_lock.lock().await;

        let has_token = self.active_token.current().await?.is_some();
        let available = self.proofs.sum().await?;
        if !has_token && available < max_cost {
            return Err(Error::InsufficientBalance {
                required: max_cost,
                available,
            });
        }

        let token = match self.get_or_create_token_locked(max_cost).await? {
            TokenResult::Cached(token) | TokenResult::Minted(token) => token,
            TokenResult::NoFunds | TokenResult::InsufficientFunds => {
                return Err(Error::InsufficientBalance {
                    required: max_cost,
                    available,
                })
            }
        };
        let token_amount = token_value(&token).unwrap_or(max_cost);

        let response = match self.node.post_chat_completion(&token, body).await {
            Ok(response) => response,
            Err(err) => {
                if err.is_auth_rejection() {
                    self.active_token.release(ReleaseReason::Invalidated).await?;
                } else if matches!(err, Error::PaymentRequired(_)) {
                    // Too little left for this model; the node may still hold a remainder
                    if let Err(refund_err) = self.refund_locked().await {
                        tracing::warn!("Could not reclaim underfunded token: {}", refund_err);
                    }
                }
                self.record(
                    TransactionRecord::failed(TransactionKind::Spent, Amount::ZERO, err.to_string())
                        .with_model(model_id),
                )
                .await;
                return Err(err);
            }
        };

        let spent = if self.refund_after_request {
            match self.refund_locked().await {
                Ok(RefundOutcome::Refunded { amount }) => token_amount.saturating_sub(amount),
                Ok(RefundOutcome::NothingToRefund) => token_amount,
                Err(err) => {
                    tracing::warn!("Refund after request failed: {}", err);
                    max_cost
                }
            }
        } else {
            max_cost
        };

        let balance = self.proofs.sum().await?;
        self.record(
            TransactionRecord::success(TransactionKind::Spent, spent)
                .with_model(model_id)
                .with_balance(balance),
        )
        .await;

        Ok(response)
    }
}

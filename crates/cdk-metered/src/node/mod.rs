//! Metered node
//!
//! The node serves paid requests against a bearer token and keeps any
//! unspent part of that token in a wallet of its own, which can be queried
//! and refunded.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::NodeInfo;

pub mod http_client;

pub use self::http_client::HttpClient;

/// Remote wallet balance response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalanceResponse {
    /// Balance in millisats
    pub balance: u64,
}

/// Remote wallet refund response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundResponse {
    /// Fresh token for the unspent remainder
    #[serde(default)]
    pub token: Option<String>,
}

/// Interface that connects the wallet to a metered node
///
/// Implementations map HTTP statuses with [`Error::from_status`]: 401/403
/// become [`Error::Authentication`], 402 becomes [`Error::PaymentRequired`].
#[async_trait]
pub trait NodeConnector: Debug + Send + Sync {
    /// Node descriptor
    async fn get_node_info(&self) -> Result<NodeInfo, Error>;

    /// Balance held by the node for `token`, in millisats
    async fn get_wallet_balance(&self, token: &str) -> Result<u64, Error>;

    /// Redeem the unspent remainder of `token` as a fresh token
    async fn post_refund(&self, token: &str) -> Result<RefundResponse, Error>;

    /// Paid, non-streaming chat completion
    async fn post_chat_completion(
        &self,
        token: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, Error>;
}

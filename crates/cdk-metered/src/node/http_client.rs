//! HTTP client for a metered node

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use super::{NodeConnector, RefundResponse, WalletBalanceResponse};
use crate::error::Error;
use crate::types::NodeInfo;

const CHAT_COMPLETIONS_PATH: &str = "v1/chat/completions";
const WALLET_BALANCE_PATH: &str = "v1/wallet/";
const WALLET_REFUND_PATH: &str = "v1/wallet/refund";

/// Http client for a metered node
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: Url,
    inner: Client,
}

impl HttpClient {
    /// Create new [`HttpClient`]
    ///
    /// `base_url` is normalized to end with `/` so endpoint paths join below
    /// it rather than replacing its last segment.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            inner: Client::new(),
        })
    }

    /// Create new [`HttpClient`] with a preconfigured [`reqwest::Client`]
    pub fn with_client(base_url: &str, inner: Client) -> Result<Self, Error> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            inner,
        })
    }

    /// Node base url
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// Check the status and deserialize the JSON body
    async fn parse_response<T>(response: Response) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::debug!("Error response ({}): {}", status, response_text);
            return Err(Error::from_status(status.as_u16(), response_text));
        }

        serde_json::from_str::<T>(&response_text).map_err(|e| {
            tracing::error!("JSON parse error: {} - Body: {}", e, response_text);
            Error::Network {
                status: Some(status.as_u16()),
                message: format!("Invalid response body: {e}"),
            }
        })
    }
}

/// Parse a node url, making sure it ends with `/`
pub fn normalize_base_url(base_url: &str) -> Result<Url, Error> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("Node URL is empty".to_string()));
    }

    let mut url = Url::parse(trimmed)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Validation(format!(
            "Unsupported node URL scheme: {}",
            url.scheme()
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl NodeConnector for HttpClient {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn get_node_info(&self) -> Result<NodeInfo, Error> {
        let response = self.inner.get(self.base_url.clone()).send().await?;
        Self::parse_response(response).await
    }

    #[instrument(skip_all)]
    async fn get_wallet_balance(&self, token: &str) -> Result<u64, Error> {
        let response = self
            .inner
            .get(self.endpoint(WALLET_BALANCE_PATH)?)
            .bearer_auth(token)
            .send()
            .await?;
        let balance: WalletBalanceResponse = Self::parse_response(response).await?;
        tracing::debug!("Node holds {} msat for the active token", balance.balance);
        Ok(balance.balance)
    }

    #[instrument(skip_all)]
    async fn post_refund(&self, token: &str) -> Result<RefundResponse, Error> {
        let response = self
            .inner
            .post(self.endpoint(WALLET_REFUND_PATH)?)
            .bearer_auth(token)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    #[instrument(skip_all)]
    async fn post_chat_completion(
        &self,
        token: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, Error> {
        let response = self
            .inner
            .post(self.endpoint(CHAT_COMPLETIONS_PATH)?)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        Self::parse_response(response).await
    }
}

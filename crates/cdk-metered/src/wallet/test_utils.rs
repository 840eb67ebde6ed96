#![cfg(test)]
#![allow(missing_docs)]

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nostr_sdk::Keys;
use serde_json::{json, Value};

use crate::amount::Amount;
use crate::database::{self, KVStore, MemoryKVStore};
use crate::error::Error;
use crate::ledger::{TransactionKind, TransactionRecord, TransactionStatus};
use crate::mint_connector::MintClient;
use crate::node::{NodeConnector, RefundResponse};
use crate::token::Token;
use crate::types::{
    proofs_total, MintQuote, MintQuoteState, Model, NodeInfo, Proof, Proofs, SatsPricing,
    SendSplit,
};
use crate::wallet::{MeteredWallet, WalletBuilder, UNSAVED_PROOFS_MARKER};

pub const TEST_MINT_URL: &str = "https://test-mint.example.com";
pub const TEST_KEYSET_ID: &str = "009a1f293253e41e";
pub const TEST_MODEL: &str = "test-model";

static SECRET_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_secret() -> String {
    format!("test-secret-{}", SECRET_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Create a test proof
pub fn test_proof(amount: u64, secret: &str) -> Proof {
    Proof {
        amount: Amount::from(amount),
        keyset_id: TEST_KEYSET_ID.to_string(),
        secret: secret.to_string(),
        c: "02698c4e2b5f9534cd0687d87513c759790cf829aa5739184a3e3735471fbda904".to_string(),
    }
}

/// Create test proofs with unique secrets
pub fn test_proofs(amounts: &[u64]) -> Proofs {
    amounts
        .iter()
        .map(|amount| test_proof(*amount, &next_secret()))
        .collect()
}

/// Encode proofs as a V3 token from the test mint
pub fn test_token(amounts: &[u64]) -> String {
    Token::new(TEST_MINT_URL, test_proofs(amounts), None, Some("sat".to_string()))
        .unwrap()
        .to_string()
}

/// Split an amount into powers of two
pub fn split_amount(amount: u64) -> Vec<u64> {
    (0..64)
        .rev()
        .map(|bit| 1u64 << bit)
        .filter(|part| amount & part != 0)
        .collect()
}

/// Node advertising [`TEST_MODEL`] with the given max cost
pub fn test_node_info(max_cost: f64) -> NodeInfo {
    NodeInfo {
        name: "test node".to_string(),
        version: "0.1.0".to_string(),
        npub: None,
        mint: Some(TEST_MINT_URL.to_string()),
        models: vec![Model {
            id: TEST_MODEL.to_string(),
            name: Some("Test Model".to_string()),
            sats_pricing: Some(SatsPricing {
                prompt: 0.001,
                completion: 0.002,
                max_cost,
            }),
        }],
    }
}

#[derive(Debug, Default)]
struct MintState {
    spent: HashSet<String>,
    quotes: HashMap<String, MintQuote>,
}

/// In-memory mint
///
/// Splits by powers of two, tracks spent secrets and keeps quotes. One-shot
/// errors can be queued per operation.
#[derive(Debug, Default)]
pub struct MockMintClient {
    state: Mutex<MintState>,
    pub send_error: Mutex<Option<Error>>,
    pub receive_error: Mutex<Option<Error>>,
    pub send_calls: AtomicU64,
}

impl MockMintClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_send(&self, err: Error) {
        *self.send_error.lock().unwrap() = Some(err);
    }

    pub fn fail_next_receive(&self, err: Error) {
        *self.receive_error.lock().unwrap() = Some(err);
    }

    pub fn set_quote_state(&self, quote_id: &str, state: MintQuoteState) {
        let mut mint = self.state.lock().unwrap();
        if let Some(quote) = mint.quotes.get_mut(quote_id) {
            quote.state = state;
        }
    }

    pub fn is_spent(&self, secret: &str) -> bool {
        self.state.lock().unwrap().spent.contains(secret)
    }

    pub fn send_calls(&self) -> u64 {
        self.send_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MintClient for MockMintClient {
    async fn send(&self, amount: Amount, proofs: Proofs) -> Result<SendSplit, Error> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.send_error.lock().unwrap().take() {
            return Err(err);
        }

        let total = proofs_total(&proofs)?;
        if total < amount {
            return Err(Error::InsufficientFunds);
        }

        let mut mint = self.state.lock().unwrap();
        if proofs.iter().any(|p| mint.spent.contains(&p.secret)) {
            return Err(Error::TokenAlreadySpent);
        }
        mint.spent.extend(proofs.iter().map(|p| p.secret.clone()));

        let change = total.to_u64() - amount.to_u64();
        Ok(SendSplit {
            outgoing: test_proofs(&split_amount(amount.to_u64())),
            change: test_proofs(&split_amount(change)),
        })
    }

    async fn receive(&self, token: &str) -> Result<Proofs, Error> {
        if let Some(err) = self.receive_error.lock().unwrap().take() {
            return Err(err);
        }

        let token = Token::from_str(token)?;
        let proofs = token.proofs();
        let value = token.value()?;

        let mut mint = self.state.lock().unwrap();
        if proofs.iter().any(|p| mint.spent.contains(&p.secret)) {
            return Err(Error::TokenAlreadySpent);
        }
        mint.spent.extend(proofs.iter().map(|p| p.secret.clone()));

        Ok(test_proofs(&split_amount(value.to_u64())))
    }

    async fn create_quote(&self, amount: Amount) -> Result<MintQuote, Error> {
        let mut mint = self.state.lock().unwrap();
        let quote = MintQuote {
            id: format!("quote-{}", mint.quotes.len()),
            invoice: format!("lnbc{}n1test", amount),
            amount: Some(amount),
            state: MintQuoteState::Unpaid,
        };
        mint.quotes.insert(quote.id.clone(), quote.clone());
        Ok(quote)
    }

    async fn check_quote(&self, quote_id: &str) -> Result<MintQuote, Error> {
        self.state
            .lock()
            .unwrap()
            .quotes
            .get(quote_id)
            .cloned()
            .ok_or_else(|| Error::Validation(format!("Unknown quote {quote_id}")))
    }

    async fn mint(&self, quote_id: &str) -> Result<Proofs, Error> {
        let mut mint = self.state.lock().unwrap();
        let quote = mint
            .quotes
            .get_mut(quote_id)
            .ok_or_else(|| Error::Validation(format!("Unknown quote {quote_id}")))?;
        if quote.state != MintQuoteState::Paid {
            return Err(Error::QuoteNotPaid(quote_id.to_string()));
        }
        quote.state = MintQuoteState::Issued;
        let amount = quote.amount.unwrap_or_default();
        Ok(test_proofs(&split_amount(amount.to_u64())))
    }
}

/// Scripted metered node
///
/// Balance, refund and completion responses default to success and can be
/// overridden once.
#[derive(Debug)]
pub struct MockNode {
    pub info: Mutex<NodeInfo>,
    pub balance_msat: Mutex<u64>,
    pub balance_error: Mutex<Option<Error>>,
    pub refund_response: Mutex<Option<Result<RefundResponse, Error>>>,
    pub chat_response: Mutex<Option<Result<Value, Error>>>,
    pub bearer_tokens: Mutex<Vec<String>>,
    pub info_calls: AtomicU64,
}

impl Default for MockNode {
    fn default() -> Self {
        Self {
            info: Mutex::new(test_node_info(30.0)),
            balance_msat: Mutex::new(0),
            balance_error: Mutex::new(None),
            refund_response: Mutex::new(None),
            chat_response: Mutex::new(None),
            bearer_tokens: Mutex::new(Vec::new()),
            info_calls: AtomicU64::new(0),
        }
    }
}

impl MockNode {
    pub fn set_balance_msat(&self, msat: u64) {
        *self.balance_msat.lock().unwrap() = msat;
    }

    pub fn fail_next_balance(&self, err: Error) {
        *self.balance_error.lock().unwrap() = Some(err);
    }

    pub fn set_refund_response(&self, response: Result<RefundResponse, Error>) {
        *self.refund_response.lock().unwrap() = Some(response);
    }

    pub fn set_chat_response(&self, response: Result<Value, Error>) {
        *self.chat_response.lock().unwrap() = Some(response);
    }

    pub fn bearer_tokens(&self) -> Vec<String> {
        self.bearer_tokens.lock().unwrap().clone()
    }

    fn saw(&self, token: &str) {
        self.bearer_tokens.lock().unwrap().push(token.to_string());
    }
}

#[async_trait]
impl NodeConnector for MockNode {
    async fn get_node_info(&self) -> Result<NodeInfo, Error> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.info.lock().unwrap().clone())
    }

    async fn get_wallet_balance(&self, token: &str) -> Result<u64, Error> {
        self.saw(token);
        if let Some(err) = self.balance_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(*self.balance_msat.lock().unwrap())
    }

    async fn post_refund(&self, token: &str) -> Result<RefundResponse, Error> {
        self.saw(token);
        let response = self
            .refund_response
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Ok(RefundResponse::default()));
        if response.is_ok() {
            *self.balance_msat.lock().unwrap() = 0;
        }
        response
    }

    async fn post_chat_completion(&self, token: &str, body: &Value) -> Result<Value, Error> {
        self.saw(token);
        self.chat_response.lock().unwrap().take().unwrap_or_else(|| {
            Ok(json!({
                "id": "chatcmpl-test",
                "object": "chat.completion",
                "model": body["model"].clone(),
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "pong"}}]
            }))
        })
    }
}

/// Wallet over fresh in-memory storage
pub fn create_test_wallet(mint: Arc<MockMintClient>, node: Arc<MockNode>) -> MeteredWallet {
    create_test_wallet_with_store(mint, node, Arc::new(MemoryKVStore::default()))
}

/// Wallet over the given storage
pub fn create_test_wallet_with_store(
    mint: Arc<MockMintClient>,
    node: Arc<MockNode>,
    localstore: Arc<dyn KVStore>,
) -> MeteredWallet {
    WalletBuilder::new()
        .mint_url(TEST_MINT_URL)
        .localstore(localstore)
        .mint_client(mint)
        .node(node)
        .build()
        .unwrap()
}

/// Wallet with a nostr identity
pub fn create_test_wallet_with_keys(
    mint: Arc<MockMintClient>,
    node: Arc<MockNode>,
    keys: Keys,
) -> MeteredWallet {
    WalletBuilder::new()
        .mint_url(TEST_MINT_URL)
        .mint_client(mint)
        .node(node)
        .identity(Arc::new(keys))
        .build()
        .unwrap()
}

/// Wallet funded with proofs of the given amounts
pub async fn create_funded_wallet(
    amounts: &[u64],
) -> (MeteredWallet, Arc<MockMintClient>, Arc<MockNode>) {
    let mint = Arc::new(MockMintClient::new());
    let node = Arc::new(MockNode::default());
    let wallet = create_test_wallet(mint.clone(), node.clone());
    wallet
        .proof_store()
        .append(test_proofs(amounts))
        .await
        .unwrap();
    (wallet, mint, node)
}

/// In-memory store whose writes to selected keys fail
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryKVStore,
    failing: Mutex<HashSet<String>>,
}

impl FlakyStore {
    pub fn fail_writes_to(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn check(&self, key: &str) -> Result<(), database::Error> {
        if self.failing.lock().unwrap().contains(key) {
            return Err(database::Error::Io(std::io::Error::other("disk full")));
        }
        Ok(())
    }
}

#[async_trait]
impl KVStore for FlakyStore {
    async fn kv_read(&self, key: &str) -> Result<Option<Vec<u8>>, database::Error> {
        self.inner.kv_read(key).await
    }

    async fn kv_write(&self, key: &str, value: &[u8]) -> Result<(), database::Error> {
        self.check(key)?;
        self.inner.kv_write(key, value).await
    }

    async fn kv_remove(&self, key: &str) -> Result<(), database::Error> {
        self.check(key)?;
        self.inner.kv_remove(key).await
    }
}

/// Wallet over a [`FlakyStore`], funded with proofs of the given amounts
pub async fn create_flaky_wallet(
    amounts: &[u64],
) -> (MeteredWallet, Arc<MockMintClient>, Arc<MockNode>, Arc<FlakyStore>) {
    let mint = Arc::new(MockMintClient::new());
    let node = Arc::new(MockNode::default());
    let store = Arc::new(FlakyStore::default());
    let wallet = create_test_wallet_with_store(mint.clone(), node.clone(), store.clone());
    if !amounts.is_empty() {
        wallet
            .proof_store()
            .append(test_proofs(amounts))
            .await
            .unwrap();
    }
    (wallet, mint, node, store)
}

/// The recovery token of the only failed `kind` record
pub async fn unsaved_token(wallet: &MeteredWallet, kind: TransactionKind) -> String {
    let failed: Vec<TransactionRecord> = wallet
        .ledger()
        .list_kind(kind)
        .await
        .unwrap()
        .into_iter()
        .filter(|record| record.status == TransactionStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1, "expected one failed record");

    let message = failed[0].message.as_deref().unwrap();
    let (_, token) = message.split_once(UNSAVED_PROOFS_MARKER).unwrap();
    assert!(token.starts_with("cashuA"));
    token.to_string()
}

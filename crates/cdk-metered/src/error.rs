//! Errors

use thiserror::Error;

use crate::amount::Amount;
use crate::database;

/// Error
///
/// Every wallet, transfer and quote operation reports failures through this
/// type. The only exception is [`crate::nostr::gift_wrap::unwrap`], which
/// degrades to `None`.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad configuration, key, URL or amount
    #[error("Validation error: {0}")]
    Validation(String),
    /// The node rejected the bearer credential (401/403)
    #[error("Authentication failed ({status}): {message}")]
    Authentication {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },
    /// Local balance does not cover the request
    #[error("Insufficient balance: required {required} sats, available {available} sats")]
    InsufficientBalance {
        /// Amount the request needs
        required: Amount,
        /// Spendable amount
        available: Amount,
    },
    /// The node reports the bearer token has no funds left (402)
    #[error("Payment required: {0}")]
    PaymentRequired(String),
    /// The mint reports the proofs cannot cover the requested split
    #[error("Insufficient funds")]
    InsufficientFunds,
    /// Unknown model id
    #[error("Invalid model: {0}")]
    InvalidModel(String),
    /// Any other transport or HTTP failure
    #[error("Network error ({status:?}): {message}")]
    Network {
        /// HTTP status code, if a response was received
        status: Option<u16>,
        /// Error message or response body
        message: String,
    },
    /// Mint split or token production failed
    #[error("Token generation failed: {0}")]
    TokenGeneration(String),
    /// Proofs were already redeemed at the mint
    #[error("Token already spent")]
    TokenAlreadySpent,
    /// Token string is not a supported cashu token
    #[error("Unsupported token")]
    UnsupportedToken,
    /// Token contains no proofs
    #[error("Token has no proofs")]
    ProofsRequired,
    /// A proof secret is already held, or repeated within one batch
    #[error("Duplicate proof secret: {0}")]
    DuplicateProof(String),
    /// Amount overflow
    #[error("Amount overflow")]
    AmountOverflow,
    /// Stale writer rejected by the proof store
    #[error("Concurrent update detected")]
    ConcurrentUpdate,
    /// A bearer token is already active
    #[error("A bearer token is already active")]
    TokenAlreadyActive,
    /// Quote is not paid yet
    #[error("Quote not paid: {0}")]
    QuoteNotPaid(String),
    /// Signing or encryption failure
    #[error("Nostr error: {0}")]
    Nostr(String),
    /// Gift wrap cryptographic failure
    #[error("Gift wrap error: {0}")]
    GiftWrap(String),
    /// Database error
    #[error(transparent)]
    Database(#[from] database::Error),
    /// Json error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Url parse error
    #[error(transparent)]
    Url(#[from] url::ParseError),
    /// Base64 error
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
    /// Utf8 error
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// The node rejected the bearer credential
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Authentication { status, .. } if *status == 401 || *status == 403)
    }

    /// Map an HTTP status and body to the matching error
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => Self::Authentication { status, message },
            402 => Self::PaymentRequired(message),
            _ => Self::Network {
                status: Some(status),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::from_status(status.as_u16(), err.to_string()),
            None => Self::Network {
                status: None,
                message: err.to_string(),
            },
        }
    }
}

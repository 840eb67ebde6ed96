//! Cashu bearer tokens
//!
//! Bearer tokens are encoded as V3 (`cashuA`) tokens. V4 (`cashuB`) tokens
//! received from elsewhere are accepted as opaque strings and handed to the
//! mint untouched.

use std::fmt;
use std::str::FromStr;

use base64::engine::{general_purpose, GeneralPurpose};
use base64::{alphabet, Engine as _};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::Error;
use crate::types::{ensure_unique_secrets, proofs_total, Proofs};

const V3_PREFIX: &str = "cashuA";
const V4_PREFIX: &str = "cashuB";

/// Proofs from one mint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintProofs {
    /// Url of mint
    pub mint: String,
    /// Proofs
    pub proofs: Proofs,
}

/// V3 token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Proofs in [`Token`] by mint
    pub token: Vec<MintProofs>,
    /// Memo for token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Token unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Token {
    /// Create new [`Token`]
    pub fn new(
        mint_url: impl Into<String>,
        proofs: Proofs,
        memo: Option<String>,
        unit: Option<String>,
    ) -> Result<Self, Error> {
        if proofs.is_empty() {
            return Err(Error::ProofsRequired);
        }

        Ok(Self {
            token: vec![MintProofs {
                mint: mint_url.into(),
                proofs,
            }],
            memo,
            unit,
        })
    }

    /// All proofs in the token
    pub fn proofs(&self) -> Proofs {
        self.token
            .iter()
            .flat_map(|t| t.proofs.iter().cloned())
            .collect()
    }

    /// Value - errors if duplicate proofs are found
    pub fn value(&self) -> Result<Amount, Error> {
        let proofs = self.proofs();
        ensure_unique_secrets(&proofs)?;
        proofs_total(&proofs)
    }

    /// Mint urls
    pub fn mint_urls(&self) -> Vec<&str> {
        self.token.iter().map(|t| t.mint.as_str()).collect()
    }
}

impl FromStr for Token {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix(V3_PREFIX).ok_or(Error::UnsupportedToken)?;

        let decode_config = general_purpose::GeneralPurposeConfig::new()
            .with_decode_padding_mode(base64::engine::DecodePaddingMode::Indifferent);
        let decoded = GeneralPurpose::new(&alphabet::URL_SAFE, decode_config).decode(s)?;
        let decoded_str = String::from_utf8(decoded)?;
        let token: Token = serde_json::from_str(&decoded_str)?;
        Ok(token)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json_string = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        let encoded = general_purpose::URL_SAFE.encode(json_string);
        write!(f, "{V3_PREFIX}{encoded}")
    }
}

/// Reject strings that are not cashu tokens before any network call
pub fn ensure_cashu_token(token: &str) -> Result<(), Error> {
    let token = token.trim();
    if token.starts_with(V3_PREFIX) || token.starts_with(V4_PREFIX) {
        Ok(())
    } else {
        Err(Error::UnsupportedToken)
    }
}

/// Value of a token when it can be read locally
///
/// Only V3 tokens can be introspected; anything else yields `None`.
pub fn token_value(token: &str) -> Option<Amount> {
    Token::from_str(token.trim())
        .and_then(|token| token.value())
        .ok()
}

//! Identity capability
//!
//! Holds a secret key and exposes only what gift wraps need: the public key,
//! event signing and ECDH based encryption (NIP-44 v2).

use std::fmt::Debug;

use async_trait::async_trait;
use nostr_sdk::nips::nip44;
use nostr_sdk::{Event, Keys, PublicKey, UnsignedEvent};

use crate::error::Error;

/// Signing and encryption identity
#[async_trait]
pub trait Identity: Debug + Send + Sync {
    /// Public key
    fn public_key(&self) -> PublicKey;

    /// Sign an event built for [`Identity::public_key`]
    async fn sign(&self, unsigned: UnsignedEvent) -> Result<Event, Error>;

    /// Encrypt `plaintext` with the shared secret of our key and `peer`
    async fn ecdh_encrypt(&self, peer: &PublicKey, plaintext: &str) -> Result<String, Error>;

    /// Decrypt `ciphertext` with the shared secret of our key and `peer`
    async fn ecdh_decrypt(&self, peer: &PublicKey, ciphertext: &str) -> Result<String, Error>;
}

#[async_trait]
impl Identity for Keys {
    fn public_key(&self) -> PublicKey {
        Keys::public_key(self)
    }

    async fn sign(&self, unsigned: UnsignedEvent) -> Result<Event, Error> {
        unsigned
            .sign_with_keys(self)
            .map_err(|e| Error::Nostr(e.to_string()))
    }

    async fn ecdh_encrypt(&self, peer: &PublicKey, plaintext: &str) -> Result<String, Error> {
        nip44::encrypt(self.secret_key(), peer, plaintext, nip44::Version::V2)
            .map_err(|e| Error::Nostr(e.to_string()))
    }

    async fn ecdh_decrypt(&self, peer: &PublicKey, ciphertext: &str) -> Result<String, Error> {
        nip44::decrypt(self.secret_key(), peer, ciphertext).map_err(|e| Error::Nostr(e.to_string()))
    }
}

/// Parse a recipient public key given as hex or npub
pub fn parse_public_key(key: &str) -> Result<PublicKey, Error> {
    PublicKey::parse(key.trim()).map_err(|e| Error::Validation(format!("Invalid public key: {e}")))
}

//! Cashu gift wraps
//!
//! A gift wrap is a signed kind `1059` event addressed to one recipient with
//! a `p` tag and marked with `["gift", "cashu"]`. Its content is the
//! NIP-44 encrypted JSON `{"token": .., "note": ..}`, keyed by the ECDH
//! secret of the sender's private key and the recipient's public key.
//!
//! Two checks exist and are kept apart:
//!
//! * [`looks_like_gift_wrap`] is structural only. An event can pass it and
//!   still be undecryptable, tampered or not addressed to us.
//! * [`verify_and_decrypt`] verifies the id and signature, checks the
//!   recipient and decrypts. Only its success means the gift is real.

use nostr_sdk::{Event, EventBuilder, EventId, Kind, PublicKey, Tag, TagKind, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::identity::Identity;
use crate::error::Error;

/// Gift wrap event kind
pub const GIFT_WRAP_KIND: Kind = Kind::GiftWrap;
/// Marker tag name
pub const GIFT_TAG: &str = "gift";
/// Marker tag value
pub const CASHU_GIFT: &str = "cashu";

const RECIPIENT_TAG: &str = "p";

/// Encrypted payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftPayload {
    /// Cashu token
    pub token: String,
    /// Note from the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Opened gift wrap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiftWrap {
    /// Gift wrap event id
    pub event_id: EventId,
    /// Sender public key
    pub sender: PublicKey,
    /// Recipient public key
    pub recipient: PublicKey,
    /// Cashu token
    pub token: String,
    /// Note from the sender
    pub note: Option<String>,
}

/// Wrap `token` for `recipient`
#[instrument(skip(token, sender, note))]
pub async fn wrap(
    token: &str,
    recipient: &PublicKey,
    sender: &dyn Identity,
    note: Option<&str>,
) -> Result<Event, Error> {
    let payload = serde_json::to_string(&GiftPayload {
        token: token.to_string(),
        note: note.map(str::to_string),
    })?;
    let ciphertext = sender.ecdh_encrypt(recipient, &payload).await?;

    let unsigned = EventBuilder::new(GIFT_WRAP_KIND, ciphertext)
        .tags([
            Tag::public_key(*recipient),
            Tag::custom(TagKind::Custom(GIFT_TAG.into()), [CASHU_GIFT]),
        ])
        .custom_created_at(Timestamp::now())
        .build(sender.public_key());

    let event = sender.sign(unsigned).await?;
    tracing::debug!("Created gift wrap {}", event.id);
    Ok(event)
}

/// Open a gift wrap addressed to `recipient`
///
/// Never fails loudly: not addressed to us, tampered, undecryptable and
/// malformed events all come back as `None`.
pub async fn unwrap(event: &Event, recipient: &dyn Identity) -> Option<GiftWrap> {
    match verify_and_decrypt(event, recipient).await {
        Ok(gift) => Some(gift),
        Err(err) => {
            tracing::debug!("Ignoring gift wrap {}: {}", event.id, err);
            None
        }
    }
}

/// Verify and open a gift wrap addressed to `recipient`
#[instrument(skip_all, fields(event_id = %event.id))]
pub async fn verify_and_decrypt(event: &Event, recipient: &dyn Identity) -> Result<GiftWrap, Error> {
    if !looks_like_gift_wrap(event) {
        return Err(Error::GiftWrap("not a cashu gift wrap".to_string()));
    }

    let recipient_key = recipient.public_key();
    if !is_addressed_to(event, &recipient_key) {
        return Err(Error::GiftWrap("not addressed to this identity".to_string()));
    }

    event
        .verify()
        .map_err(|e| Error::GiftWrap(format!("invalid event: {e}")))?;

    let plaintext = recipient
        .ecdh_decrypt(&event.pubkey, &event.content)
        .await
        .map_err(|e| Error::GiftWrap(format!("decryption failed: {e}")))?;
    let payload: GiftPayload = serde_json::from_str(&plaintext)
        .map_err(|e| Error::GiftWrap(format!("invalid payload: {e}")))?;

    Ok(GiftWrap {
        event_id: event.id,
        sender: event.pubkey,
        recipient: recipient_key,
        token: payload.token,
        note: payload.note,
    })
}

/// Structural check: kind `1059` with a `p` tag and a `gift=cashu` tag
pub fn looks_like_gift_wrap(event: &Event) -> bool {
    event.kind == GIFT_WRAP_KIND && recipient_of(event).is_some() && has_cashu_marker(event)
}

/// Alias of [`looks_like_gift_wrap`]
///
/// Structural only; a `true` result means "plausibly a cashu gift wrap".
pub fn is_valid_cashu_gift_wrap(event: &Event) -> bool {
    looks_like_gift_wrap(event)
}

/// First `p` tag value
pub fn recipient_of(event: &Event) -> Option<&str> {
    event.tags.iter().find_map(|tag| match tag.as_slice() {
        [name, value, ..] if name == RECIPIENT_TAG => Some(value.as_str()),
        _ => None,
    })
}

fn is_addressed_to(event: &Event, recipient: &PublicKey) -> bool {
    let hex = recipient.to_hex();
    event.tags.iter().any(|tag| {
        matches!(tag.as_slice(), [name, value, ..] if name == RECIPIENT_TAG && *value == hex)
    })
}

fn has_cashu_marker(event: &Event) -> bool {
    event.tags.iter().any(|tag| {
        matches!(tag.as_slice(), [name, value, ..] if name == GIFT_TAG && value == CASHU_GIFT)
    })
}

#[cfg(test)]
mod tests {
    use nostr_sdk::Keys;

    use super::*;

    const TOKEN: &str = "cashuAeyJ0b2tlbiI6W3sibWludCI6Imh0dHBzOi8vbWludC5leGFtcGxlLmNvbSIsInByb29mcyI6W119XX0=";

    #[tokio::test]
    async fn test_wrap_unwrap_round_trip() {
        let sender = Keys::generate();
        let recipient = Keys::generate();

        let event = wrap(TOKEN, &recipient.public_key(), &sender, Some("happy birthday"))
            .await
            .unwrap();

        assert_eq!(event.kind.as_u16(), 1059);
        assert_eq!(event.pubkey, sender.public_key());
        assert!(!event.content.contains(TOKEN));
        assert!(looks_like_gift_wrap(&event));
        assert_eq!(
            recipient_of(&event),
            Some(recipient.public_key().to_hex().as_str())
        );

        let gift = unwrap(&event, &recipient).await.unwrap();
        assert_eq!(gift.token, TOKEN);
        assert_eq!(gift.note.as_deref(), Some("happy birthday"));
        assert_eq!(gift.sender, sender.public_key());
        assert_eq!(gift.recipient, recipient.public_key());
        assert_eq!(gift.event_id, event.id);
    }

    #[tokio::test]
    async fn test_unwrap_without_note() {
        let sender = Keys::generate();
        let recipient = Keys::generate();

        let event = wrap(TOKEN, &recipient.public_key(), &sender, None)
            .await
            .unwrap();
        let gift = verify_and_decrypt(&event, &recipient).await.unwrap();
        assert_eq!(gift.token, TOKEN);
        assert_eq!(gift.note, None);
    }

    #[tokio::test]
    async fn test_unwrap_wrong_recipient_is_none() {
        let sender = Keys::generate();
        let recipient = Keys::generate();
        let eve = Keys::generate();

        let event = wrap(TOKEN, &recipient.public_key(), &sender, None)
            .await
            .unwrap();

        // Structurally fine, but not for eve
        assert!(looks_like_gift_wrap(&event));
        assert!(unwrap(&event, &eve).await.is_none());
        assert!(matches!(
            verify_and_decrypt(&event, &eve).await,
            Err(Error::GiftWrap(_))
        ));
    }

    #[tokio::test]
    async fn test_structural_check_ignores_ciphertext() {
        let sender = Keys::generate();
        let recipient = Keys::generate();

        let event = EventBuilder::new(GIFT_WRAP_KIND, "definitely not ciphertext")
            .tags([
                Tag::public_key(recipient.public_key()),
                Tag::custom(TagKind::Custom(GIFT_TAG.into()), [CASHU_GIFT]),
            ])
            .sign_with_keys(&sender)
            .unwrap();

        assert!(is_valid_cashu_gift_wrap(&event));
        assert!(unwrap(&event, &recipient).await.is_none());
    }

    #[tokio::test]
    async fn test_structural_check_requires_kind_and_tags() {
        let sender = Keys::generate();
        let recipient = Keys::generate();

        let missing_marker = EventBuilder::new(GIFT_WRAP_KIND, "x")
            .tags([Tag::public_key(recipient.public_key())])
            .sign_with_keys(&sender)
            .unwrap();
        assert!(!looks_like_gift_wrap(&missing_marker));

        let missing_recipient = EventBuilder::new(GIFT_WRAP_KIND, "x")
            .tags([Tag::custom(TagKind::Custom(GIFT_TAG.into()), [CASHU_GIFT])])
            .sign_with_keys(&sender)
            .unwrap();
        assert!(!looks_like_gift_wrap(&missing_recipient));

        let wrong_marker = EventBuilder::new(GIFT_WRAP_KIND, "x")
            .tags([
                Tag::public_key(recipient.public_key()),
                Tag::custom(TagKind::Custom(GIFT_TAG.into()), ["zap"]),
            ])
            .sign_with_keys(&sender)
            .unwrap();
        assert!(!looks_like_gift_wrap(&wrong_marker));

        let wrong_kind = EventBuilder::new(Kind::TextNote, "x")
            .tags([
                Tag::public_key(recipient.public_key()),
                Tag::custom(TagKind::Custom(GIFT_TAG.into()), [CASHU_GIFT]),
            ])
            .sign_with_keys(&sender)
            .unwrap();
        assert!(!looks_like_gift_wrap(&wrong_kind));
    }

    #[tokio::test]
    async fn test_tampered_content_is_rejected() {
        let sender = Keys::generate();
        let recipient = Keys::generate();

        let event = wrap(TOKEN, &recipient.public_key(), &sender, None)
            .await
            .unwrap();

        let mut json = serde_json::to_value(&event).unwrap();
        let content = json["content"].as_str().unwrap().to_string();
        json["content"] = serde_json::Value::String(format!("{content}AA"));
        let tampered: Event = serde_json::from_value(json).unwrap();

        assert!(looks_like_gift_wrap(&tampered));
        assert!(unwrap(&tampered, &recipient).await.is_none());
    }
}

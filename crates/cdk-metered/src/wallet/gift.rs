use nostr_sdk::{Event, EventId};
use tracing::instrument;

use crate::amount::Amount;
use crate::error::Error;
use crate::ledger::{TransactionKind, TransactionRecord};
use crate::nostr::gift_wrap::{self, GiftWrap};
use crate::nostr::parse_public_key;
use crate::wallet::MeteredWallet;

/// Gift wrap that was opened and redeemed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedGift {
    /// Opened gift wrap
    pub gift: GiftWrap,
    /// Sats added to the proof store
    pub amount: Amount,
}

impl MeteredWallet {
    /// Wrap a fresh token of `amount` sats for `recipient`
    ///
    /// `recipient` is a hex or npub public key. The signed event is stored
    /// locally and returned; publishing it to a relay is up to the caller.
    #[instrument(skip(self, note))]
    pub async fn send_gift(
        &self,
        amount: Amount,
        recipient: &str,
        note: Option<&str>,
    ) -> Result<Event, Error> {
        let identity = self.require_identity()?.clone();
        let recipient = parse_public_key(recipient)?;

        let _guard = self.op_lock.lock().await;
        let token = self.send_token_locked(amount, None).await?;

        let event = match gift_wrap::wrap(&token, &recipient, identity.as_ref(), note).await {
            Ok(event) => event,
            Err(err) => {
                // The token is already split off; keep it recoverable
                tracing::error!("Could not wrap gift: {}", err);
                self.record_unsaved_token(TransactionKind::GiftSent, amount, &err, &token)
                    .await;
                return Err(err);
            }
        };

        if let Err(err) = self.gifts.add(event.clone()).await {
            self.record_unsaved_token(TransactionKind::GiftSent, amount, &err, &token)
                .await;
            return Err(err);
        }

        let balance = self.proofs.sum().await?;
        let mut record =
            TransactionRecord::success(TransactionKind::GiftSent, amount).with_balance(balance);
        if let Some(note) = note {
            record = record.with_message(note);
        }
        self.record(record).await;

        tracing::info!("Wrapped {} sats for {}", amount, recipient);
        Ok(event)
    }

    /// Open a gift wrap addressed to us and redeem its token
    ///
    /// Returns `Ok(None)` for events that are not for us or cannot be
    /// opened. Failing to redeem an opened gift is an error.
    #[instrument(skip_all, fields(event_id = %event.id))]
    pub async fn receive_gift(&self, event: &Event) -> Result<Option<ReceivedGift>, Error> {
        let identity = self.require_identity()?.clone();

        let Some(gift) = gift_wrap::unwrap(event, identity.as_ref()).await else {
            return Ok(None);
        };

        let _guard = self.op_lock.lock().await;
        let amount = self
            .import_locked(&gift.token, TransactionKind::GiftReceived)
            .await?;

        Ok(Some(ReceivedGift { gift, amount }))
    }

    /// Sent gift wraps, oldest first
    pub async fn sent_gifts(&self) -> Result<Vec<Event>, Error> {
        self.gifts.list().await
    }

    /// Forget a sent gift wrap
    pub async fn remove_sent_gift(&self, event_id: &EventId) -> Result<bool, Error> {
        self.gifts.remove(event_id).await
    }
}

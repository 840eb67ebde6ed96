//! Sent gift wraps
//!
//! Signed gift wrap events are kept in insertion order so they can be
//! re-published. Removal filters by event id.

use std::sync::Arc;

use nostr_sdk::{Event, EventId};
use tokio::sync::Mutex;

use crate::database::{self, KVStore, GIFT_WRAPS_KEY};
use crate::error::Error;

/// Persisted list of sent gift wraps
#[derive(Debug)]
pub struct GiftStore {
    localstore: Arc<dyn KVStore>,
    lock: Mutex<()>,
}

impl GiftStore {
    /// Create new [`GiftStore`]
    pub fn new(localstore: Arc<dyn KVStore>) -> Self {
        Self {
            localstore,
            lock: Mutex::new(()),
        }
    }

    /// Append a signed gift wrap
    pub async fn add(&self, event: Event) -> Result<(), Error> {
        let _guard = self.lock.lock().await;
        let mut events = self.read().await?;
        events.push(event);
        database::write_json(self.localstore.as_ref(), GIFT_WRAPS_KEY, &events).await?;
        Ok(())
    }

    /// All sent gift wraps, oldest first
    pub async fn list(&self) -> Result<Vec<Event>, Error> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Remove the gift wrap with `event_id`
    ///
    /// Returns `false` when no such event was stored.
    pub async fn remove(&self, event_id: &EventId) -> Result<bool, Error> {
        let _guard = self.lock.lock().await;
        let mut events = self.read().await?;
        let before = events.len();
        events.retain(|event| event.id != *event_id);

        if events.len() == before {
            return Ok(false);
        }

        database::write_json(self.localstore.as_ref(), GIFT_WRAPS_KEY, &events).await?;
        tracing::debug!("Removed sent gift wrap {}", event_id);
        Ok(true)
    }

    async fn read(&self) -> Result<Vec<Event>, Error> {
        Ok(database::read_json(self.localstore.as_ref(), GIFT_WRAPS_KEY)
            .await?
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use nostr_sdk::{EventBuilder, Keys, Kind};

    use super::*;
    use crate::database::MemoryKVStore;

    fn event(keys: &Keys, content: &str) -> Event {
        EventBuilder::new(Kind::GiftWrap, content)
            .sign_with_keys(keys)
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_list_remove() {
        let localstore: Arc<dyn KVStore> = Arc::new(MemoryKVStore::default());
        let store = GiftStore::new(localstore.clone());
        let keys = Keys::generate();

        let first = event(&keys, "first");
        let second = event(&keys, "second");
        store.add(first.clone()).await.unwrap();
        store.add(second.clone()).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);

        assert!(store.remove(&first.id).await.unwrap());
        assert!(!store.remove(&first.id).await.unwrap());

        // Persisted, not only cached
        let reopened = GiftStore::new(localstore);
        let listed = reopened.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, second.id);
        assert!(listed[0].verify().is_ok());
    }
}

//! Active bearer token
//!
//! At most one bearer token is presented to the node at a time. The slot is
//! an explicit state machine:
//!
//! ```text
//! Idle --activate--> Active --release(Refunded)----> Idle
//!                           --release(Invalidated)--> Idle
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::instrument;

use crate::database::{self, KVStore, ACTIVE_TOKEN_KEY};
use crate::error::Error;

/// State of the bearer token slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    /// No token is held by the node
    Idle,
    /// Token currently presented to the node
    Active(String),
}

/// Why an active token was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    /// The node's remainder was reclaimed
    Refunded,
    /// The node rejected or exhausted the token
    Invalidated,
}

impl fmt::Display for ReleaseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refunded => write!(f, "refunded"),
            Self::Invalidated => write!(f, "invalidated"),
        }
    }
}

/// Persisted bearer token slot
#[derive(Debug)]
pub struct ActiveTokenSlot {
    localstore: Arc<dyn KVStore>,
    state: Mutex<Option<TokenState>>,
}

impl ActiveTokenSlot {
    /// Create new [`ActiveTokenSlot`]
    pub fn new(localstore: Arc<dyn KVStore>) -> Self {
        Self {
            localstore,
            state: Mutex::new(None),
        }
    }

    /// Current state
    pub async fn state(&self) -> Result<TokenState, Error> {
        let mut state = self.state.lock().await;
        Ok(self.load(&mut state).await?.clone())
    }

    /// Active token string, if any
    pub async fn current(&self) -> Result<Option<String>, Error> {
        Ok(match self.state().await? {
            TokenState::Active(token) => Some(token),
            TokenState::Idle => None,
        })
    }

    /// `Idle -> Active`
    #[instrument(skip_all)]
    pub async fn activate(&self, token: String) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if let TokenState::Active(_) = self.load(&mut state).await? {
            return Err(Error::TokenAlreadyActive);
        }

        database::write_json(self.localstore.as_ref(), ACTIVE_TOKEN_KEY, &token).await?;
        *state = Some(TokenState::Active(token));
        tracing::debug!("Bearer token activated");
        Ok(())
    }

    /// `Active -> Idle`
    ///
    /// Returns the released token, or `None` if the slot was already idle.
    /// Invalidations are logged at info level, refunds at debug.
    #[instrument(skip_all, fields(reason = %reason))]
    pub async fn release(&self, reason: ReleaseReason) -> Result<Option<String>, Error> {
        let mut state = self.state.lock().await;
        let previous = match self.load(&mut state).await? {
            TokenState::Active(token) => token.clone(),
            TokenState::Idle => return Ok(None),
        };

        self.localstore.kv_remove(ACTIVE_TOKEN_KEY).await?;
        *state = Some(TokenState::Idle);
        match reason {
            ReleaseReason::Refunded => tracing::debug!("Bearer token released: {}", reason),
            // Whatever the node still held for it is no longer tracked
            ReleaseReason::Invalidated => tracing::info!("Bearer token released: {}", reason),
        }
        Ok(Some(previous))
    }

    async fn load<'a>(
        &self,
        state: &'a mut Option<TokenState>,
    ) -> Result<&'a TokenState, Error> {
        if state.is_none() {
            let stored: Option<String> =
                database::read_json(self.localstore.as_ref(), ACTIVE_TOKEN_KEY).await?;
            *state = Some(match stored {
                Some(token) if !token.is_empty() => TokenState::Active(token),
                _ => TokenState::Idle,
            });
        }
        Ok(state.get_or_insert(TokenState::Idle))
    }
}

//! [`SessionStore`] capability and the in-memory implementation.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by a session store backend.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// The backing file could not be read, written, or removed.
    #[error("session storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted session could not be serialised.
    #[error("session record could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Single-slot storage for the current bearer token.
///
/// Reads observe either a complete token or none at all. Concurrent writers
/// resolve last-writer-wins.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Return the stored token, if any.
    async fn get_token(&self) -> Result<Option<String>, SessionStoreError>;

    /// Store (or replace) the token.
    async fn set_token(&self, token: &str) -> Result<(), SessionStoreError>;

    /// Forget the token. Clearing an empty store is not an error.
    async fn clear_token(&self) -> Result<(), SessionStoreError>;
}

/// Process-local store backed by an atomically swapped slot.
///
/// Not durable; suited to tests and embedders that persist elsewhere.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    slot: Arc<ArcSwapOption<String>>,
}

impl fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the token itself.
        f.debug_struct("MemorySessionStore")
            .field("has_token", &self.slot.load().is_some())
            .finish()
    }
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.slot.store(Some(Arc::new(token.into())));
        store
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_token(&self) -> Result<Option<String>, SessionStoreError> {
        Ok(self.slot.load_full().map(|t| t.as_ref().clone()))
    }

    async fn set_token(&self, token: &str) -> Result<(), SessionStoreError> {
        self.slot.store(Some(Arc::new(token.to_owned())));
        Ok(())
    }

    async fn clear_token(&self) -> Result<(), SessionStoreError> {
        self.slot.store(None);
        Ok(())
    }
}

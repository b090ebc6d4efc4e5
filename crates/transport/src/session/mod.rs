//! Bearer-token session storage.
//!
//! # Lifecycle
//!
//! 1. A sign-in stores the token via [`SessionStore::set_token`].
//! 2. The request interceptor reads it on every dispatched call.
//! 3. A 401 response or an explicit logout clears it.
//!
//! # Invariants
//!
//! - Exactly one session slot exists per store; there is no per-user keying.
//! - Tokens are **never** logged or included in traces.

pub mod file;
pub mod store;

pub use file::FileSessionStore;
pub use store::{MemorySessionStore, SessionStore, SessionStoreError};

#[cfg(test)]
pub use store::MockSessionStore;

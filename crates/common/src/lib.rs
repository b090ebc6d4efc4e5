//! Wire types, session events, and errors shared across `secure-transport` crates.

pub mod error;
pub mod protocol;

pub use error::TransportError;
pub use protocol::{SecureEnvelope, SessionEvent};

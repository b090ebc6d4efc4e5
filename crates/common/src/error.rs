//! Error taxonomy surfaced by every transport call.

use thiserror::Error;

/// Failure of a single dispatched call.
///
/// Only [`TransportError::SessionExpired`] is preceded by a local side effect
/// (the stored session is cleared). Every other variant reaches the caller
/// exactly as it was produced. Process exit codes follow `sysexits.h`:
/// - [`TransportError::Encryption`] / [`TransportError::Decryption`] → 65
/// - [`TransportError::Network`] → 69
/// - [`TransportError::Upstream`] → 75
/// - [`TransportError::ContractViolation`] → 76
/// - [`TransportError::SessionExpired`] → 77
#[derive(Debug, Error)]
pub enum TransportError {
    /// The payload could not be serialised or sealed.
    #[error("encryption failure: {0}")]
    Encryption(String),

    /// The ciphertext was malformed or sealed under a different passphrase.
    #[error("decryption failure: {0}")]
    Decryption(String),

    /// No response was received.
    #[error("network failure: {0}")]
    Network(String),

    /// The backend answered 401; the stored session has been cleared.
    #[error("session expired")]
    SessionExpired,

    /// A 2xx response whose decoded body fails the endpoint's shape check.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// Any other non-2xx status.
    #[error("upstream returned {status}{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Upstream { status: u16, detail: Option<String> },

    /// The session store could not persist or clear a token.
    #[error("session store failure: {0}")]
    SessionStore(String),

    /// The request could not be built (bad path, header, or multipart part).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Returns the process exit code a command-line front end should use.
    pub fn exit_code(&self) -> u8 {
        match self {
            TransportError::InvalidRequest(_) => 64,
            TransportError::Encryption(_) | TransportError::Decryption(_) => 65,
            TransportError::Network(_) => 69,
            TransportError::SessionStore(_) => 74,
            TransportError::Upstream { .. } => 75,
            TransportError::ContractViolation(_) => 76,
            TransportError::SessionExpired => 77,
        }
    }

    /// Returns `true` for the 401 path that tore down the session.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, TransportError::SessionExpired)
    }
}

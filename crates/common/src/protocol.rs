//! Bodies exchanged with the backend and signals raised to the presentation layer.
//!
//! Every authenticated endpoint speaks the same envelope in both directions:
//!
//! ```text
//! { "data": "v1.<salt>.<nonce>.<ciphertext>" }
//! ```
//!
//! The decrypted text is a JSON document whose shape belongs to the endpoint.

use serde::{Deserialize, Serialize};

/// Name of the multipart text part carrying the sealed non-file fields.
pub const MULTIPART_DATA_FIELD: &str = "data";

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Request and response body for every encrypted endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureEnvelope {
    /// Opaque ciphertext produced by the envelope codec.
    pub data: String,
}

impl SecureEnvelope {
    /// Wrap an already sealed ciphertext string.
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

// ---------------------------------------------------------------------------
// Error body
// ---------------------------------------------------------------------------

/// Best-effort view of a non-2xx response body.
///
/// Backends disagree on the field name, so both `message` and `error` are
/// accepted. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorBody {
    /// Extract the server-provided detail from a raw response body, if any.
    pub fn detail_from(raw: &[u8]) -> Option<String> {
        let body: ErrorBody = serde_json::from_slice(raw).ok()?;
        body.message
            .or(body.error)
            .filter(|detail| !detail.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Session events
// ---------------------------------------------------------------------------

/// Out-of-band session lifecycle signal delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A sign-in stored a fresh bearer token.
    SignedIn,
    /// The session was cleared by an explicit logout.
    SignedOut,
    /// The backend answered 401 and the stored token was discarded.
    Expired,
}

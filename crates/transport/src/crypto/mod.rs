//! Envelope encryption primitives.
//!
//! This module is intentionally free of HTTP dependencies.
//!
//! # Ciphertext format
//!
//! ```text
//! v1.<base64url-no-pad(salt)>.<base64url-no-pad(nonce)>.<base64url-no-pad(ciphertext+tag)>
//! ```
//!
//! The `v1` prefix enables future algorithm migration without breaking
//! existing ciphertext.

pub mod cipher;
pub mod codec;

pub use codec::EnvelopeCodec;

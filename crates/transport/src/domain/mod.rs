//! Domain call pattern and the endpoint bindings built on it.
//!
//! Every payload-bearing call runs the same sequence:
//!
//! 1. Seal the payload with the [`EnvelopeCodec`](crate::crypto::EnvelopeCodec).
//! 2. Dispatch through the [`TransportClient`](crate::client::TransportClient).
//! 3. Open the response envelope and parse the JSON inside.
//! 4. Run the endpoint's [`Contract`] check.
//!
//! A failure at any step is returned unchanged; the caller decides what the
//! user sees.

pub mod auth;
pub mod call;
pub mod profile;

pub use auth::{SignInRequest, SignInResult};
pub use call::{Contract, RawResponse, SecureClient};
pub use profile::ProfileResult;

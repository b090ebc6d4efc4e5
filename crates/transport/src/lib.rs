//! `secure-transport` — encrypted-envelope HTTP transport for a mobile backend.
//!
//! Layering, leaves first:
//! 1. [`crypto`] seals JSON payloads into self-describing ciphertext strings.
//! 2. [`session`] keeps the single bearer token, durably.
//! 3. [`client`] dispatches calls through the request/response interceptors.
//! 4. [`domain`] runs encode → dispatch → decode → contract check per endpoint.
//!
//! A [`SecureClient`] is built once (usually via [`Config::build_client`]) and
//! cloned into every place that makes calls. There is no global client.

pub mod client;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod session;
pub mod telemetry;

pub use common::{SecureEnvelope, SessionEvent, TransportError};

pub use client::{Credential, FilePart};
pub use config::Config;
pub use crypto::EnvelopeCodec;
pub use domain::{Contract, SecureClient};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};

//! HTTP transport, per-call request context, and the interceptor chain.
//!
//! # Responsibilities
//! - Hold the base URL and default JSON headers.
//! - Run the request interceptor (credential, multipart header fix-up).
//! - Run the response interceptor (401 teardown, error mapping).

pub mod context;
pub mod interceptor;
pub mod transport;

pub use context::{Credential, FilePart, RequestBody, RequestContext};
pub use transport::{TransportClient, TransportSettings};

//! Structured logging and optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No tokens, passphrases, or decoded payloads** may appear in any span
//!   attribute or log field. Request ids, methods, paths, and statuses may.
//! - Log level is configurable via `STX_LOG_LEVEL` (default: `info`);
//!   `RUST_LOG` takes precedence when set.

pub mod init;

pub use init::init_telemetry;

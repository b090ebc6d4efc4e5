//! Configuration loading and validation for the secure transport.
//!
//! All values are read from `STX_`-prefixed environment variables. Loading
//! fails with a clear message if a required variable is missing or invalid.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::client::TransportSettings;
use crate::crypto::EnvelopeCodec;
use crate::domain::SecureClient;
use crate::session::FileSessionStore;

/// Environment variable prefix (`STX_BASE_URL`, `STX_ENVELOPE_PASSPHRASE`, ...).
pub const ENV_PREFIX: &str = "STX";

/// Validated client configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Backend root URL, `http` or `https`. **Required.**
    pub base_url: String,

    /// Passphrase shared with the backend for envelope sealing. **Required.**
    pub envelope_passphrase: String,

    /// File holding the persisted session token.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,

    /// Per-request timeout in seconds. Unset keeps the transport default.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP endpoint for span export. Unset disables export.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("envelope_passphrase", &"[REDACTED]")
            .field("session_path", &self.session_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("log_level", &self.log_level)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .finish()
    }
}

fn default_session_path() -> PathBuf {
    PathBuf::from(".stx/session")
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.base_url, "STX_BASE_URL")?;
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            anyhow::bail!("STX_BASE_URL must start with http:// or https://");
        }
        ensure_non_empty(&self.envelope_passphrase, "STX_ENVELOPE_PASSPHRASE")?;
        if self.session_path.as_os_str().is_empty() {
            anyhow::bail!("STX_SESSION_PATH must not be empty");
        }
        if self.request_timeout_secs == Some(0) {
            anyhow::bail!("STX_REQUEST_TIMEOUT_SECS must be > 0 when set");
        }
        if let Some(endpoint) = &self.otel_exporter_otlp_endpoint {
            ensure_non_empty(endpoint, "STX_OTEL_EXPORTER_OTLP_ENDPOINT")?;
        }
        Ok(())
    }

    /// Transport settings derived from this configuration.
    pub fn transport_settings(&self) -> TransportSettings {
        let mut settings = TransportSettings::new(&self.base_url);
        settings.timeout = self.request_timeout_secs.map(Duration::from_secs);
        settings
    }

    /// Open the session file and assemble a [`SecureClient`].
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be read or the client
    /// cannot be built.
    pub async fn build_client(&self) -> Result<SecureClient> {
        let store = FileSessionStore::open(&self.session_path)
            .await
            .with_context(|| format!("failed to open session file {}", self.session_path.display()))?;
        let codec = EnvelopeCodec::new(&self.envelope_passphrase)
            .context("invalid envelope passphrase")?;
        SecureClient::new(&self.transport_settings(), codec, Arc::new(store))
            .context("failed to build secure client")
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

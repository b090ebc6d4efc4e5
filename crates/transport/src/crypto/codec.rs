//! [`EnvelopeCodec`]: JSON payloads to and from sealed envelope strings.

use std::fmt;
use std::sync::Arc;

use common::{SecureEnvelope, TransportError};
use serde::{de::DeserializeOwned, Serialize};

use super::cipher::{self, CipherError, SealedText};

/// Seals JSON-serialisable payloads under the shared passphrase.
///
/// Cheap to clone; the passphrase is held behind an `Arc`.
#[derive(Clone)]
pub struct EnvelopeCodec {
    passphrase: Arc<[u8]>,
}

impl fmt::Debug for EnvelopeCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the passphrase.
        f.write_str("EnvelopeCodec([REDACTED])")
    }
}

impl EnvelopeCodec {
    /// Build a codec for `passphrase`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Encryption`] if the passphrase is empty.
    pub fn new(passphrase: impl AsRef<[u8]>) -> Result<Self, TransportError> {
        let passphrase = passphrase.as_ref();
        if passphrase.is_empty() {
            return Err(TransportError::Encryption(
                CipherError::EmptyPassphrase.to_string(),
            ));
        }
        Ok(Self {
            passphrase: Arc::from(passphrase),
        })
    }

    /// Serialise `plaintext` to JSON and seal it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Encryption`] on serialisation or cipher failure.
    pub fn encode<T: Serialize + ?Sized>(&self, plaintext: &T) -> Result<String, TransportError> {
        let json = serde_json::to_vec(plaintext)
            .map_err(|e| TransportError::Encryption(format!("payload not serialisable: {e}")))?;
        let sealed = cipher::seal(&json, &self.passphrase)
            .map_err(|e| TransportError::Encryption(e.to_string()))?;
        Ok(sealed.to_string_repr())
    }

    /// Open a sealed string and return the JSON text inside.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Decryption`] if `ciphertext` is malformed, was
    /// sealed under another passphrase, or does not hold UTF-8 text.
    pub fn decode(&self, ciphertext: &str) -> Result<String, TransportError> {
        let sealed: SealedText = ciphertext
            .parse()
            .map_err(|e: CipherError| TransportError::Decryption(e.to_string()))?;
        let bytes = cipher::open(&sealed, &self.passphrase)
            .map_err(|e| TransportError::Decryption(e.to_string()))?;
        String::from_utf8(bytes)
            .map_err(|_| TransportError::Decryption("plaintext is not UTF-8".into()))
    }

    /// Seal `plaintext` straight into a wire envelope.
    pub fn seal_envelope<T: Serialize + ?Sized>(
        &self,
        plaintext: &T,
    ) -> Result<SecureEnvelope, TransportError> {
        self.encode(plaintext).map(SecureEnvelope::new)
    }

    /// Open a wire envelope and parse the JSON inside as `T`.
    ///
    /// Text that opens cleanly but is not JSON of the expected shape is a
    /// [`TransportError::ContractViolation`]: the server sealed it, so the
    /// cipher did its job.
    pub fn open_envelope<T: DeserializeOwned>(
        &self,
        envelope: &SecureEnvelope,
    ) -> Result<T, TransportError> {
        let text = self.decode(&envelope.data)?;
        serde_json::from_str(&text)
            .map_err(|e| TransportError::ContractViolation(format!("decoded body: {e}")))
    }
}

//! Passphrase-keyed AES-256-GCM-SIV sealing of opaque byte strings.
//!
//! **Key derivation:** HKDF-SHA256 over the shared passphrase with a fresh
//! random salt per message, so every sealed value uses its own key and the
//! output carries everything `open` needs besides the passphrase.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) is authenticated and
//! nonce-misuse-resistant. A wrong passphrase or a flipped bit fails the tag
//! check instead of producing garbage plaintext.

use std::str::FromStr;

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the per-message HKDF salt.
pub const SALT_LEN: usize = 16;

/// Prefix that appears at the start of every sealed value.
pub const VERSION_PREFIX: &str = "v1";

/// HKDF `info` binding derived keys to this envelope format.
const KDF_INFO: &[u8] = b"secure-transport/envelope/v1";

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The shared passphrase is empty.
    #[error("passphrase must not be empty")]
    EmptyPassphrase,

    /// HKDF could not expand the passphrase into a key.
    #[error("key derivation failed")]
    KeyDerivation,

    /// AES-GCM-SIV sealing or opening failed (wrong passphrase or tampered data).
    #[error("aead operation failed")]
    AeadFailure,

    /// The sealed string does not match `v1.<salt>.<nonce>.<ciphertext>`.
    #[error("invalid sealed value format")]
    InvalidFormat,
}

/// A parsed sealed value.
///
/// The string representation is
/// `v1.<base64url(salt)>.<base64url(nonce)>.<base64url(ciphertext+tag)>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedText {
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
}

impl SealedText {
    /// Encode this value to its canonical string representation.
    pub fn to_string_repr(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            VERSION_PREFIX,
            URL_SAFE_NO_PAD.encode(self.salt),
            URL_SAFE_NO_PAD.encode(self.nonce),
            URL_SAFE_NO_PAD.encode(&self.ciphertext),
        )
    }
}

impl FromStr for SealedText {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().splitn(4, '.').collect();
        if parts.len() != 4 || parts[0] != VERSION_PREFIX {
            return Err(CipherError::InvalidFormat);
        }
        let salt = decode_fixed::<SALT_LEN>(parts[1])?;
        let nonce = decode_fixed::<NONCE_LEN>(parts[2])?;
        let ciphertext = URL_SAFE_NO_PAD
            .decode(parts[3])
            .map_err(|_| CipherError::InvalidFormat)?;
        if ciphertext.is_empty() {
            return Err(CipherError::InvalidFormat);
        }
        Ok(Self {
            salt,
            nonce,
            ciphertext,
        })
    }
}

fn decode_fixed<const N: usize>(part: &str) -> Result<[u8; N], CipherError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|_| CipherError::InvalidFormat)?;
    bytes.try_into().map_err(|_| CipherError::InvalidFormat)
}

/// Per-message key derived from the passphrase. Zeroed on drop.
struct DerivedKey([u8; KEY_LEN]);

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

fn derive_key(passphrase: &[u8], salt: &[u8; SALT_LEN]) -> Result<DerivedKey, CipherError> {
    if passphrase.is_empty() {
        return Err(CipherError::EmptyPassphrase);
    }
    let hk = Hkdf::<Sha256>::new(Some(salt), passphrase);
    let mut key = DerivedKey([0u8; KEY_LEN]);
    hk.expand(KDF_INFO, &mut key.0)
        .map_err(|_| CipherError::KeyDerivation)?;
    Ok(key)
}

fn build_cipher(key: &DerivedKey) -> Result<Aes256GcmSiv, CipherError> {
    Aes256GcmSiv::new_from_slice(&key.0).map_err(|_| CipherError::KeyDerivation)
}

/// Seal `plaintext` under a key derived from `passphrase`.
///
/// A random salt and a random 96-bit nonce are drawn from the OS CSPRNG per
/// call, so sealing the same plaintext twice yields different output.
///
/// # Errors
///
/// Returns [`CipherError::EmptyPassphrase`] if `passphrase` is empty.
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error.
pub fn seal(plaintext: &[u8], passphrase: &[u8]) -> Result<SealedText, CipherError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt)?;
    let ciphertext = build_cipher(&key)?
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CipherError::AeadFailure)?;

    Ok(SealedText {
        salt,
        nonce,
        ciphertext,
    })
}

/// Open a [`SealedText`] back to plaintext bytes.
///
/// # Errors
///
/// Returns [`CipherError::EmptyPassphrase`] if `passphrase` is empty.
/// Returns [`CipherError::AeadFailure`] if authentication fails (wrong passphrase or tampered data).
pub fn open(sealed: &SealedText, passphrase: &[u8]) -> Result<Vec<u8>, CipherError> {
    let key = derive_key(passphrase, &sealed.salt)?;
    build_cipher(&key)?
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_ref())
        .map_err(|_| CipherError::AeadFailure)
}

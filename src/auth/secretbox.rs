//! Symmetric encryption and display masking of the stored third-party
//! secret.
//!
//! Ciphertext layout is `nonce (12 bytes) || ciphertext`, base64-encoded so
//! it persists as an opaque text column and round-trips exactly.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

const NONCE_LEN: usize = 12;

/// Secrets shorter than this reveal nothing at all when masked.
const MASK_MIN_LEN: usize = 10;
/// Prefix length for secrets carrying a recognized vendor marker.
const MASK_VENDOR_PREFIX: usize = 10;
/// Prefix length for everything else.
const MASK_GENERIC_PREFIX: usize = 6;
const MASK_SUFFIX: usize = 4;
const MASK_TOKEN: &str = "****";
const VENDOR_MARKER: &str = "sk-";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretBoxError {
    /// Key mismatch, truncation, or tampering. Callers treat the stored
    /// secret as unusable, not as a crash.
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("encryption failed")]
    EncryptionFailed,
}

/// Encrypts, decrypts, and masks the stored third-party secret with a
/// process-wide key loaded once at startup.
#[derive(Clone)]
pub struct SecretBox {
    cipher: ChaCha20Poly1305,
}

impl SecretBox {
    #[must_use]
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }

    /// Encrypt a plaintext secret into a self-contained opaque string.
    ///
    /// # Errors
    ///
    /// Returns `EncryptionFailed` if the underlying AEAD fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, SecretBoxError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| SecretBoxError::EncryptionFailed)?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(combined))
    }

    /// Decrypt a previously encrypted secret.
    ///
    /// # Errors
    ///
    /// Returns `DecryptionFailed` on key mismatch, truncation, corruption, or
    /// non-UTF-8 plaintext.
    pub fn decrypt(&self, encoded: &str) -> Result<String, SecretBoxError> {
        let combined = STANDARD
            .decode(encoded)
            .map_err(|_| SecretBoxError::DecryptionFailed)?;
        if combined.len() < NONCE_LEN {
            return Err(SecretBoxError::DecryptionFailed);
        }
        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| SecretBoxError::DecryptionFailed)?;
        String::from_utf8(plaintext).map_err(|_| SecretBoxError::DecryptionFailed)
    }

    /// Render a secret for display: fixed prefix, masked middle, last four
    /// characters. Short secrets collapse to the mask token alone.
    ///
    /// All lengths count characters, not bytes, so multi-byte input masks
    /// the same as ASCII. Display-only; never reversible and never persisted.
    #[must_use]
    pub fn mask(plaintext: &str) -> String {
        let char_count = plaintext.chars().count();
        if char_count < MASK_MIN_LEN {
            return MASK_TOKEN.to_string();
        }

        let prefix_len = if plaintext.starts_with(VENDOR_MARKER) {
            MASK_VENDOR_PREFIX
        } else {
            MASK_GENERIC_PREFIX
        };
        let prefix: String = plaintext.chars().take(prefix_len).collect();
        let suffix: String = plaintext.chars().skip(char_count - MASK_SUFFIX).collect();
        format!("{prefix}{MASK_TOKEN}{suffix}")
    }
}

impl std::fmt::Debug for SecretBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretBox").finish_non_exhaustive()
    }
}

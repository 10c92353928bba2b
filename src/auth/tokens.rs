//! Single-use token material for email verification and password reset.
//!
//! The raw token only ever travels in the outbound email link; the database
//! stores a SHA-256 hash, and redemption compares hashes.

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;

/// Generate a URL-safe single-use token with 32 bytes of OS entropy.
///
/// # Errors
///
/// Returns an error if the OS randomness source fails.
pub fn generate_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate single-use token")?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a raw token for storage and lookup.
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_carries_full_entropy() {
        let token = generate_token().unwrap();
        let decoded = URL_SAFE_NO_PAD.decode(token.as_bytes()).unwrap();
        assert_eq!(decoded.len(), TOKEN_BYTES);
    }

    #[test]
    fn generated_tokens_differ() {
        assert_ne!(generate_token().unwrap(), generate_token().unwrap());
    }

    #[test]
    fn hash_is_stable_and_distinguishes_inputs() {
        let first = hash_token("token");
        let second = hash_token("token");
        let different = hash_token("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
    }

    #[test]
    fn hash_never_echoes_the_token() {
        let token = generate_token().unwrap();
        assert!(!hash_token(&token).contains(&token));
    }
}

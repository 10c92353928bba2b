//! One-way password hashing and verification.
//!
//! Passwords are Argon2id-hashed with a fresh salt per call; verification
//! recomputes and compares without ever reporting why a mismatch failed.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use rand::rngs::OsRng;

/// Hashes and verifies user passwords with process-wide cost parameters.
#[derive(Clone, Debug)]
pub struct PasswordVault {
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
}

impl PasswordVault {
    /// Build a vault with explicit Argon2id cost parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are outside Argon2's accepted range.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        // Validate eagerly so bad configuration aborts startup, not a request.
        argon2::Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|_| anyhow!("invalid password hashing parameters"))?;
        Ok(Self {
            memory_kib,
            iterations,
            parallelism,
        })
    }

    fn hasher(&self) -> Result<Argon2<'static>> {
        let params = argon2::Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|_| anyhow!("invalid password hashing parameters"))?;
        Ok(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            params,
        ))
    }

    /// Hash a password with a fresh random salt.
    ///
    /// Two calls with the same password produce different hashes that both
    /// verify.
    ///
    /// # Errors
    ///
    /// Returns an error on empty input or if hashing itself fails.
    pub fn hash(&self, password: &str) -> Result<String> {
        if password.is_empty() {
            return Err(anyhow!("password must not be empty"));
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|_| anyhow!("failed to hash password"))?
            .to_string();
        Ok(hash)
    }

    /// Verify a password against a stored hash.
    ///
    /// Any failure (wrong password, unparseable hash) is reported as a plain
    /// `false`; callers never learn which.
    #[must_use]
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        let Ok(argon2) = self.hasher() else {
            return false;
        };
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fast_vault() -> PasswordVault {
        // Minimal cost so the suite stays quick.
        PasswordVault::with_params(8, 1, 1).unwrap()
    }

    #[test]
    fn hash_and_verify_round_trip() {
        let vault = fast_vault();
        let hash = vault.hash("correct horse 1").unwrap();
        assert!(vault.verify("correct horse 1", &hash));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let vault = fast_vault();
        let hash = vault.hash("correct horse 1").unwrap();
        assert!(!vault.verify("correct horse 1x", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let vault = fast_vault();
        let first = vault.hash("repeat me 9").unwrap();
        let second = vault.hash("repeat me 9").unwrap();
        assert_ne!(first, second);
        assert!(vault.verify("repeat me 9", &first));
        assert!(vault.verify("repeat me 9", &second));
    }

    #[test]
    fn empty_password_is_rejected() {
        let vault = fast_vault();
        assert!(vault.hash("").is_err());
    }

    #[test]
    fn verify_tolerates_garbage_hash() {
        let vault = fast_vault();
        assert!(!vault.verify("anything1", "not-a-phc-string"));
    }

    #[test]
    fn invalid_params_are_rejected() {
        assert!(PasswordVault::with_params(0, 0, 0).is_err());
    }
}

//! Immutable process configuration and the shared component state.
//!
//! Every knob here is loaded once at startup and held by reference for the
//! process lifetime; no component re-reads configuration per call.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use std::{sync::Arc, time::Duration};

use crate::api::email::{EmailSender, LogEmailSender, Notifier};
use crate::auth::{PasswordVault, SecretBox, SessionTokenIssuer};
use crate::validator::{CredentialValidator, HttpValidator};

const DEFAULT_SESSION_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
const DEFAULT_VERIFICATION_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_RESET_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_VALIDATOR_TIMEOUT_SECONDS: u64 = 10;

// Argon2id cost defaults, matching the argon2 crate's own defaults.
pub const DEFAULT_PASSWORD_MEMORY_KIB: u32 = 19_456;
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 2;
pub const DEFAULT_PASSWORD_PARALLELISM: u32 = 1;

/// Process-wide configuration for the credential subsystem.
#[derive(Clone)]
pub struct AppConfig {
    signing_key: SecretString,
    cipher_key: [u8; 32],
    validator_url: String,
    frontend_base_url: String,
    session_ttl_seconds: i64,
    verification_ttl_seconds: i64,
    reset_ttl_seconds: i64,
    validator_timeout_seconds: u64,
    password_memory_kib: u32,
    password_iterations: u32,
    password_parallelism: u32,
}

impl AppConfig {
    #[must_use]
    pub fn new(
        signing_key: SecretString,
        cipher_key: [u8; 32],
        validator_url: String,
        frontend_base_url: String,
    ) -> Self {
        Self {
            signing_key,
            cipher_key,
            validator_url,
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            verification_ttl_seconds: DEFAULT_VERIFICATION_TTL_SECONDS,
            reset_ttl_seconds: DEFAULT_RESET_TTL_SECONDS,
            validator_timeout_seconds: DEFAULT_VALIDATOR_TIMEOUT_SECONDS,
            password_memory_kib: DEFAULT_PASSWORD_MEMORY_KIB,
            password_iterations: DEFAULT_PASSWORD_ITERATIONS,
            password_parallelism: DEFAULT_PASSWORD_PARALLELISM,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_verification_ttl_seconds(mut self, seconds: i64) -> Self {
        self.verification_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_validator_timeout_seconds(mut self, seconds: u64) -> Self {
        self.validator_timeout_seconds = seconds;
        self
    }

    /// Override the Argon2id cost parameters used for password hashing.
    /// Validated when the state is built, so a bad cost aborts startup.
    #[must_use]
    pub fn with_password_cost(mut self, memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        self.password_memory_kib = memory_kib;
        self.password_iterations = iterations;
        self.password_parallelism = parallelism;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn verification_ttl_seconds(&self) -> i64 {
        self.verification_ttl_seconds
    }

    #[must_use]
    pub fn reset_ttl_seconds(&self) -> i64 {
        self.reset_ttl_seconds
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn password_cost(&self) -> (u32, u32, u32) {
        (
            self.password_memory_kib,
            self.password_iterations,
            self.password_parallelism,
        )
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("signing_key", &"***")
            .field("cipher_key", &"***")
            .field("validator_url", &self.validator_url)
            .field("frontend_base_url", &self.frontend_base_url)
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("verification_ttl_seconds", &self.verification_ttl_seconds)
            .field("reset_ttl_seconds", &self.reset_ttl_seconds)
            .field("validator_timeout_seconds", &self.validator_timeout_seconds)
            .field("password_memory_kib", &self.password_memory_kib)
            .field("password_iterations", &self.password_iterations)
            .field("password_parallelism", &self.password_parallelism)
            .finish()
    }
}

/// Decode the base64 cipher key and require exactly 32 bytes.
///
/// # Errors
///
/// Returns an error on malformed base64 or wrong key length; callers abort
/// startup on failure rather than failing lazily per request.
pub fn decode_cipher_key(encoded: &str) -> Result<[u8; 32]> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .context("secret cipher key is not valid base64")?;
    let key: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow!("secret cipher key must decode to exactly 32 bytes"))?;
    Ok(key)
}

/// Components built once from [`AppConfig`] and shared across requests.
#[derive(Clone)]
pub struct AppState {
    config: AppConfig,
    vault: PasswordVault,
    secret_box: SecretBox,
    issuer: SessionTokenIssuer,
    validator: Arc<dyn CredentialValidator>,
    notifier: Notifier,
}

impl AppState {
    /// Build the production state: HTTP validator and log-only email sender.
    ///
    /// # Errors
    ///
    /// Returns an error if any component rejects its configuration.
    pub fn new(config: AppConfig) -> Result<Self> {
        let validator = Arc::new(HttpValidator::new(
            config.validator_url.clone(),
            Duration::from_secs(config.validator_timeout_seconds),
        )?);
        Self::with_parts(config, validator, Arc::new(LogEmailSender))
    }

    /// Build the state with explicit validator and email sender, used by
    /// tests to stub external collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if any component rejects its configuration.
    pub fn with_parts(
        config: AppConfig,
        validator: Arc<dyn CredentialValidator>,
        sender: Arc<dyn EmailSender>,
    ) -> Result<Self> {
        let issuer = SessionTokenIssuer::new(config.signing_key.expose_secret().as_bytes())?;
        let secret_box = SecretBox::new(&config.cipher_key);
        let vault = PasswordVault::with_params(
            config.password_memory_kib,
            config.password_iterations,
            config.password_parallelism,
        )?;
        Ok(Self {
            config,
            vault,
            secret_box,
            issuer,
            validator,
            notifier: Notifier::new(sender),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn vault(&self) -> &PasswordVault {
        &self.vault
    }

    #[must_use]
    pub fn secret_box(&self) -> &SecretBox {
        &self.secret_box
    }

    #[must_use]
    pub fn issuer(&self) -> &SessionTokenIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn validator(&self) -> &Arc<dyn CredentialValidator> {
        &self.validator
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig::new(
            SecretString::from("signing-key"),
            [7u8; 32],
            "https://validator.example/check".to_string(),
            "https://app.example".to_string(),
        )
    }

    #[test]
    fn defaults_match_token_policies() {
        let config = test_config();
        assert_eq!(config.session_ttl_seconds(), 30 * 24 * 60 * 60);
        assert_eq!(config.verification_ttl_seconds(), 24 * 60 * 60);
        assert_eq!(config.reset_ttl_seconds(), 60 * 60);
    }

    #[test]
    fn builders_override_defaults() {
        let config = test_config()
            .with_session_ttl_seconds(60)
            .with_verification_ttl_seconds(120)
            .with_reset_ttl_seconds(30)
            .with_validator_timeout_seconds(3);
        assert_eq!(config.session_ttl_seconds(), 60);
        assert_eq!(config.verification_ttl_seconds(), 120);
        assert_eq!(config.reset_ttl_seconds(), 30);
    }

    #[test]
    fn debug_masks_key_material() {
        let rendered = format!("{:?}", test_config());
        assert!(!rendered.contains("signing-key"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn decode_cipher_key_accepts_32_bytes() {
        let encoded = STANDARD.encode([9u8; 32]);
        assert_eq!(decode_cipher_key(&encoded).unwrap(), [9u8; 32]);
    }

    #[test]
    fn decode_cipher_key_rejects_wrong_length_and_garbage() {
        let short = STANDARD.encode([9u8; 16]);
        assert!(decode_cipher_key(&short).is_err());
        assert!(decode_cipher_key("!!!not-base64!!!").is_err());
    }

    #[test]
    fn state_builds_from_config() {
        let state = AppState::new(test_config()).unwrap();
        assert_eq!(state.config().frontend_base_url(), "https://app.example");
    }

    #[test]
    fn password_cost_defaults_and_override() {
        let config = test_config();
        assert_eq!(
            config.password_cost(),
            (
                DEFAULT_PASSWORD_MEMORY_KIB,
                DEFAULT_PASSWORD_ITERATIONS,
                DEFAULT_PASSWORD_PARALLELISM
            )
        );
        let config = config.with_password_cost(8, 1, 1);
        assert_eq!(config.password_cost(), (8, 1, 1));
    }

    #[test]
    fn configured_cost_reaches_the_vault() {
        // Minimal cost keeps the hash call fast; it must verify round-trip.
        let state = AppState::new(test_config().with_password_cost(8, 1, 1)).unwrap();
        let hash = state.vault().hash("correct horse 1").unwrap();
        assert!(state.vault().verify("correct horse 1", &hash));
        assert!(hash.contains("m=8,t=1,p=1"));
    }

    #[test]
    fn invalid_password_cost_aborts_state_build() {
        assert!(AppState::new(test_config().with_password_cost(0, 0, 0)).is_err());
    }
}

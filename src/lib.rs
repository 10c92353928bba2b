//! # Identigo (Credential & Identity Lifecycle)
//!
//! `identigo` owns the credential lifecycle of an account: password
//! hashing and verification, bearer-token issuance, encryption-at-rest
//! of a user-supplied third-party secret, and the single-use token
//! workflows for email verification and password reset.
//!
//! ## Account model
//!
//! An account moves along two independent axes: `{unverified, verified}`
//! and `{no secret, secret inactive, secret active}`. Registration
//! creates an unverified account; redeeming the emailed verification
//! token flips it to verified; login is gated on the verified state and
//! mints a stateless bearer token.
//!
//! ## Single-use tokens
//!
//! Verification and reset tokens are 32 bytes of OS randomness, sent to
//! the user as URL-safe base64 and stored only as a SHA-256 hash.
//! Redemption is a single conditional `UPDATE` (compare-and-clear), so
//! two concurrent redemptions of the same token resolve to exactly one
//! success.
//!
//! ## Stored third-party secret
//!
//! The secret is encrypted with ChaCha20-Poly1305 under a process-wide
//! key loaded once at startup. Status reads only ever expose a masked
//! rendering; a decryption failure is reported as "no usable secret",
//! never as an error.

pub mod api;
pub mod auth;
pub mod cli;
pub mod validator;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}

//! Stateless signed bearer tokens.
//!
//! Tokens are HS256 JWTs carrying a fixed claims shape. The signing key is
//! immutable process-wide configuration; there is no server-side revocation,
//! so a token stays valid for its full ttl once issued.

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed claims payload shared by issue and verify.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject identifier (the account email).
    pub sub: String,
    pub user_id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Internal verification failure reasons.
///
/// The HTTP boundary collapses all of these into one generic
/// "unauthenticated" outcome so callers cannot use verification as a
/// signature-forging oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    SignatureInvalid,
    Expired,
}

#[derive(Clone)]
pub struct SessionTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionTokenIssuer {
    /// Build an issuer from the raw signing key bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty; startup aborts rather than
    /// issuing unverifiable tokens.
    pub fn new(signing_key: &[u8]) -> Result<Self> {
        if signing_key.is_empty() {
            return Err(anyhow!("token signing key must not be empty"));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
        })
    }

    /// Issue a signed token for `subject` with expiry `now + ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn issue(&self, subject: &str, user_id: Uuid, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            user_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| anyhow!("failed to sign session token: {err}"))
    }

    /// Validate signature and expiry, returning the embedded claims.
    ///
    /// # Errors
    ///
    /// Distinguishes `Malformed`, `SignatureInvalid`, and `Expired` for
    /// internal use.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => match err.kind() {
                ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                ErrorKind::InvalidSignature => Err(TokenError::SignatureInvalid),
                _ => Err(TokenError::Malformed),
            },
        }
    }
}

impl std::fmt::Debug for SessionTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenIssuer").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn issuer() -> SessionTokenIssuer {
        SessionTokenIssuer::new(b"test-signing-key").unwrap()
    }

    #[test]
    fn issue_then_verify_returns_same_claims() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let token = issuer
            .issue("alice@example.com", user_id, Duration::hours(1))
            .unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = issuer();
        let token = issuer
            .issue("alice@example.com", Uuid::new_v4(), Duration::seconds(-60))
            .unwrap();
        assert_eq!(issuer.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_signed_with_other_key_is_rejected() {
        let token = issuer()
            .issue("alice@example.com", Uuid::new_v4(), Duration::hours(1))
            .unwrap();
        let other = SessionTokenIssuer::new(b"another-key").unwrap();
        assert_eq!(other.verify(&token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn garbage_token_is_malformed() {
        assert_eq!(
            issuer().verify("definitely-not-a-jwt"),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let issuer = issuer();
        let token = issuer
            .issue("alice@example.com", Uuid::new_v4(), Duration::hours(1))
            .unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let altered = format!("{}A", parts[1]);
        parts[1] = &altered;
        let tampered = parts.join(".");
        assert!(issuer.verify(&tampered).is_err());
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(SessionTokenIssuer::new(b"").is_err());
    }
}

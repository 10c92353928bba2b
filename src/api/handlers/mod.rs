//! Route handlers and shared request plumbing.

pub mod health;
pub use self::health::health;

pub mod register;
pub use self::register::register;

pub mod login;
pub use self::login::login;

pub mod verification;
pub use self::verification::{resend_verification, verify_email};

pub mod password;
pub use self::password::{change_password, request_password_reset, reset_password};

pub mod secret;
pub use self::secret::{delete_secret, secret_status, set_secret, test_secret};

pub mod account;
pub use self::account::{delete_account, me};

pub mod types;

// common functions for the handlers
use axum::http::{header::AUTHORIZATION, HeaderMap};
use regex::Regex;
use sqlx::PgPool;
use tracing::debug;

use crate::api::error::{ApiError, FieldError};
use crate::api::state::AppState;
use crate::api::storage::{self, Account};

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Password acceptance policy, enforced before hashing: minimum length 8,
/// at least one letter, at least one digit.
pub(crate) fn validate_new_password(password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if password.chars().count() < 8 {
        errors.push(FieldError::new(
            "password",
            "must be at least 8 characters",
        ));
    }
    if !password.chars().any(char::is_alphabetic) {
        errors.push(FieldError::new(
            "password",
            "must contain at least one letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(FieldError::new(
            "password",
            "must contain at least one digit",
        ));
    }
    errors
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the bearer token into the calling account.
///
/// Malformed, forged, and expired tokens all collapse into the same
/// `AuthenticationFailed` outcome at this boundary.
pub(crate) async fn authenticate(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AppState,
) -> Result<Account, ApiError> {
    let Some(token) = extract_bearer_token(headers) else {
        return Err(ApiError::AuthenticationFailed);
    };

    let claims = state.issuer().verify(token).map_err(|err| {
        debug!("Bearer token rejected: {err:?}");
        ApiError::AuthenticationFailed
    })?;

    let account = storage::lookup_by_id(pool, claims.user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::AuthenticationFailed)?;

    if !account.is_active {
        return Err(ApiError::AuthenticationFailed);
    }

    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn password_policy_accepts_compliant_password() {
        assert!(validate_new_password("abcdef12").is_empty());
    }

    #[test]
    fn password_policy_reports_each_violation() {
        let errors = validate_new_password("a1");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("8 characters"));

        let errors = validate_new_password("12345678");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("letter"));

        let errors = validate_new_password("abcdefgh");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("digit"));
    }

    #[test]
    fn password_policy_stacks_violations() {
        let errors = validate_new_password("ab");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn extract_bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123"));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(extract_bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);

        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}

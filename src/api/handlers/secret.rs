//! Stored third-party secret: status, validation, set, and clear.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::warn;

use crate::api::error::{ApiError, FieldError};
use crate::api::handlers::authenticate;
use crate::api::handlers::types::{SecretStatusResponse, SecretTestResponse, SetSecretRequest};
use crate::api::state::AppState;
use crate::api::storage::{clear_secret, store_secret, Account};
use crate::auth::SecretBox;
use crate::validator::ValidationOutcome;

fn outcome_response(outcome: &ValidationOutcome) -> SecretTestResponse {
    match outcome {
        ValidationOutcome::Ok => SecretTestResponse {
            success: true,
            message: "secret accepted by validator".to_string(),
            error: None,
        },
        ValidationOutcome::AuthInvalid => SecretTestResponse {
            success: false,
            message: "validator rejected the secret".to_string(),
            error: Some("invalid credentials".to_string()),
        },
        ValidationOutcome::PermissionDenied => SecretTestResponse {
            success: false,
            message: "secret lacks required permissions".to_string(),
            error: Some("permission denied".to_string()),
        },
        ValidationOutcome::RateLimited => SecretTestResponse {
            success: false,
            message: "validator is rate limiting; retry later".to_string(),
            error: Some("rate limited".to_string()),
        },
        ValidationOutcome::Unknown(detail) => SecretTestResponse {
            success: false,
            message: "validator could not be reached".to_string(),
            error: Some(detail.clone()),
        },
    }
}

fn status_of(account: &Account, secret_box: &SecretBox) -> SecretStatusResponse {
    let Some(encrypted) = account.encrypted_secret.as_deref() else {
        return SecretStatusResponse {
            has_secret: false,
            secret_active: false,
            secret_verified_at: None,
            masked_secret: None,
        };
    };

    // A decryption failure means the stored secret is unusable (key rotation,
    // corruption); report it as absent rather than erroring a status read.
    match secret_box.decrypt(encrypted) {
        Ok(plaintext) => SecretStatusResponse {
            has_secret: true,
            secret_active: account.secret_active,
            secret_verified_at: account.secret_verified_at,
            masked_secret: Some(SecretBox::mask(&plaintext)),
        },
        Err(err) => {
            warn!(account_id = %account.id, "Stored secret is unusable: {err}");
            SecretStatusResponse {
                has_secret: false,
                secret_active: false,
                secret_verified_at: None,
                masked_secret: None,
            }
        }
    }
}

/// Report the state of the stored secret, masked for display.
#[utoipa::path(
    get,
    path = "/settings/secret-status",
    responses(
        (status = 200, description = "Secret status", body = SecretStatusResponse),
        (status = 401, description = "Unauthenticated")
    ),
    tag = "settings"
)]
pub async fn secret_status(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let account = authenticate(&headers, &pool, &state).await?;
    let status = status_of(&account, state.secret_box());
    Ok((StatusCode::OK, Json(status)))
}

/// Validate a candidate secret without persisting anything.
#[utoipa::path(
    post,
    path = "/settings/secret/test",
    request_body = SetSecretRequest,
    responses(
        (status = 200, description = "Validator verdict", body = SecretTestResponse),
        (status = 401, description = "Unauthenticated")
    ),
    tag = "settings"
)]
pub async fn test_secret(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<SetSecretRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let _account = authenticate(&headers, &pool, &state).await?;

    let request = match payload {
        Some(Json(payload)) => payload,
        None => {
            return Err(ApiError::Validation(vec![FieldError::new(
                "body",
                "missing payload",
            )]))
        }
    };

    let outcome = state.validator().validate(&request.secret).await;
    Ok((StatusCode::OK, Json(outcome_response(&outcome))))
}

/// Validate, encrypt, and store a secret, activating it.
///
/// The validator runs before anything is written; any non-Ok outcome leaves
/// a previously stored secret and its active flag completely untouched.
#[utoipa::path(
    post,
    path = "/settings/secret",
    request_body = SetSecretRequest,
    responses(
        (status = 200, description = "Secret stored", body = SecretStatusResponse),
        (status = 401, description = "Unauthenticated"),
        (status = 422, description = "Validator rejected the secret")
    ),
    tag = "settings"
)]
pub async fn set_secret(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<SetSecretRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let account = authenticate(&headers, &pool, &state).await?;

    let request = match payload {
        Some(Json(payload)) => payload,
        None => {
            return Err(ApiError::Validation(vec![FieldError::new(
                "body",
                "missing payload",
            )]))
        }
    };

    if request.secret.trim().is_empty() {
        return Err(ApiError::Validation(vec![FieldError::new(
            "secret",
            "must not be empty",
        )]));
    }

    let outcome = state.validator().validate(&request.secret).await;
    if outcome != ValidationOutcome::Ok {
        let verdict = outcome_response(&outcome);
        return Err(ApiError::Validation(vec![FieldError::new(
            "secret",
            verdict.message,
        )]));
    }

    let encrypted = state
        .secret_box()
        .encrypt(&request.secret)
        .map_err(|err| ApiError::Internal(err.into()))?;
    let account = store_secret(&pool, account.id, &encrypted).await?;

    let status = status_of(&account, state.secret_box());
    Ok((StatusCode::OK, Json(status)))
}

/// Unconditionally remove the stored secret.
#[utoipa::path(
    delete,
    path = "/settings/secret",
    responses(
        (status = 204, description = "Secret cleared"),
        (status = 401, description = "Unauthenticated")
    ),
    tag = "settings"
)]
pub async fn delete_secret(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let account = authenticate(&headers, &pool, &state).await?;
    clear_secret(&pool, account.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn account_with_secret(encrypted: Option<String>, active: bool) -> Account {
        Account {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            password_hash: "hash".to_string(),
            is_active: true,
            email_verified: true,
            verification_token: None,
            verification_issued_at: None,
            reset_token: None,
            reset_expires_at: None,
            encrypted_secret: encrypted,
            secret_active: active,
            secret_verified_at: active.then(Utc::now),
            login_count: 0,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn status_without_secret_is_empty() {
        let secret_box = SecretBox::new(&[1u8; 32]);
        let status = status_of(&account_with_secret(None, false), &secret_box);
        assert!(!status.has_secret);
        assert!(!status.secret_active);
        assert!(status.masked_secret.is_none());
    }

    #[test]
    fn status_masks_decryptable_secret() {
        let secret_box = SecretBox::new(&[1u8; 32]);
        let encrypted = secret_box.encrypt("sk-ant-api03-secret-tail").unwrap();
        let status = status_of(&account_with_secret(Some(encrypted), true), &secret_box);
        assert!(status.has_secret);
        assert!(status.secret_active);
        let masked = status.masked_secret.unwrap();
        assert!(masked.contains("****"));
        assert!(!masked.contains("api03-secret"));
    }

    #[test]
    fn status_reports_undecryptable_secret_as_absent() {
        let writer = SecretBox::new(&[1u8; 32]);
        let reader = SecretBox::new(&[2u8; 32]);
        let encrypted = writer.encrypt("sk-ant-api03-secret-tail").unwrap();
        let status = status_of(&account_with_secret(Some(encrypted), true), &reader);
        assert!(!status.has_secret);
        assert!(!status.secret_active);
        assert!(status.masked_secret.is_none());
    }

    #[test]
    fn outcome_responses_cover_all_verdicts() {
        assert!(outcome_response(&ValidationOutcome::Ok).success);
        for outcome in [
            ValidationOutcome::AuthInvalid,
            ValidationOutcome::PermissionDenied,
            ValidationOutcome::RateLimited,
            ValidationOutcome::Unknown("timeout".to_string()),
        ] {
            let verdict = outcome_response(&outcome);
            assert!(!verdict.success);
            assert!(verdict.error.is_some());
        }
    }
}

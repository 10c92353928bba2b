//! Password change and reset endpoints.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::email::{build_reset_url, EmailKind};
use crate::api::error::{ApiError, FieldError};
use crate::api::handlers::types::{
    ChangePasswordRequest, PasswordResetRequest, PublicUser, ResetPasswordRequest,
};
use crate::api::handlers::{authenticate, normalize_email, validate_new_password};
use crate::api::state::AppState;
use crate::api::storage::{
    consume_reset_token, lookup_by_email, set_reset_token, update_password,
};
use crate::auth::tokens;

/// Change the password of the authenticated account.
///
/// The current password must verify before the new one is accepted.
#[utoipa::path(
    post,
    path = "/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 401, description = "Current password wrong or token unusable"),
        (status = 422, description = "New password violates policy")
    ),
    tag = "auth"
)]
pub async fn change_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<ChangePasswordRequest>>,
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

    if !state
        .vault()
        .verify(&request.current_password, &account.password_hash)
    {
        return Err(ApiError::AuthenticationFailed);
    }

    let errors = validate_new_password(&request.new_password);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let new_hash = state.vault().hash(&request.new_password)?;
    update_password(&pool, account.id, &new_hash).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Request a password-reset email.
///
/// Always answers 202; account existence is never disclosed. A fresh token
/// overwrites any prior pending reset and expires one hour after issuance.
#[utoipa::path(
    post,
    path = "/auth/request-password-reset",
    request_body = PasswordResetRequest,
    responses(
        (status = 202, description = "Reset request accepted")
    ),
    tag = "auth"
)]
pub async fn request_password_reset(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<PasswordResetRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => {
            return Err(ApiError::Validation(vec![FieldError::new(
                "body",
                "missing payload",
            )]))
        }
    };

    let email = normalize_email(&request.email);
    let Some(account) = lookup_by_email(&pool, &email).await? else {
        return Ok(StatusCode::ACCEPTED);
    };

    let token = tokens::generate_token()?;
    let token_hash = tokens::hash_token(&token);
    set_reset_token(
        &pool,
        account.id,
        &token_hash,
        state.config().reset_ttl_seconds(),
    )
    .await?;

    let reset_url = build_reset_url(state.config().frontend_base_url(), &token);
    state.notifier().notify(
        EmailKind::PasswordReset,
        &account.email,
        &json!({ "reset_url": reset_url }),
    );

    Ok(StatusCode::ACCEPTED)
}

/// Redeem a reset token and install a new password.
///
/// The lookup requires the stored token to match and to be inside its expiry
/// window; the new hash is installed and both reset fields cleared by the
/// same statement. Wrong, expired, and consumed tokens fail identically.
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = PublicUser),
        (status = 400, description = "Invalid or expired token"),
        (status = 422, description = "New password violates policy")
    ),
    tag = "auth"
)]
pub async fn reset_password(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => {
            return Err(ApiError::Validation(vec![FieldError::new(
                "body",
                "missing payload",
            )]))
        }
    };

    let token = request.token.trim();
    if token.is_empty() {
        return Err(ApiError::ExpiredOrInvalid);
    }

    let errors = validate_new_password(&request.new_password);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let new_hash = state.vault().hash(&request.new_password)?;
    let token_hash = tokens::hash_token(token);
    let account = consume_reset_token(&pool, &token_hash, &new_hash)
        .await?
        .ok_or(ApiError::ExpiredOrInvalid)?;

    Ok((StatusCode::OK, Json(PublicUser::from(&account))))
}

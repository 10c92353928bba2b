//! Email verification endpoints.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::email::{build_verify_url, EmailKind};
use crate::api::error::{ApiError, FieldError};
use crate::api::handlers::normalize_email;
use crate::api::handlers::types::{PublicUser, ResendVerificationRequest, VerifyEmailRequest};
use crate::api::state::AppState;
use crate::api::storage::{
    consume_verification_token, lookup_by_email, refresh_verification_token,
};
use crate::auth::tokens;

/// Redeem a verification token and flip the account to verified.
///
/// Consumption is compare-and-clear: of two concurrent redemptions of the
/// same token, exactly one succeeds. A wrong, expired, or already-consumed
/// token fails with one uniform error.
#[utoipa::path(
    post,
    path = "/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = PublicUser),
        (status = 400, description = "Invalid or expired token")
    ),
    tag = "auth"
)]
pub async fn verify_email(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<VerifyEmailRequest>>,
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

    // Raw tokens are never stored; hash before lookup.
    let token_hash = tokens::hash_token(token);
    let account = consume_verification_token(
        &pool,
        &token_hash,
        state.config().verification_ttl_seconds(),
    )
    .await?
    .ok_or(ApiError::ExpiredOrInvalid)?;

    // Single-use consumption means this fires at most once per account.
    state
        .notifier()
        .notify(EmailKind::Welcome, &account.email, &json!({}));

    Ok((StatusCode::OK, Json(PublicUser::from(&account))))
}

/// Resend a verification email.
///
/// Always answers 202: whether the account exists, and whether it is already
/// verified, is not disclosed to unauthenticated callers.
#[utoipa::path(
    post,
    path = "/auth/resend-verification",
    request_body = ResendVerificationRequest,
    responses(
        (status = 202, description = "Resend accepted")
    ),
    tag = "auth"
)]
pub async fn resend_verification(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<ResendVerificationRequest>>,
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

    // A fresh token overwrites any prior pending one; at most one live
    // verification token per account. Already-verified accounts fall through
    // to the same accepted response.
    let token = tokens::generate_token()?;
    let token_hash = tokens::hash_token(&token);
    if refresh_verification_token(&pool, account.id, &token_hash).await? {
        let verify_url = build_verify_url(state.config().frontend_base_url(), &token);
        state.notifier().notify(
            EmailKind::Verification,
            &account.email,
            &json!({ "verify_url": verify_url }),
        );
    }

    Ok(StatusCode::ACCEPTED)
}

//! Account registration.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::email::{build_verify_url, EmailKind};
use crate::api::error::{ApiError, FieldError};
use crate::api::handlers::{normalize_email, valid_email, validate_new_password};
use crate::api::state::AppState;
use crate::api::storage::{insert_account, SignupOutcome};
use crate::api::handlers::types::{PublicUser, RegisterRequest};
use crate::auth::tokens;

/// Register a new account: hash the password, create the row unverified, and
/// send the verification email out-of-band.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = PublicUser),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Validation failed")
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<RegisterRequest>>,
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
    let mut errors = Vec::new();
    if !valid_email(&email) {
        errors.push(FieldError::new("email", "malformed email address"));
    }
    errors.extend(validate_new_password(&request.password));
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let password_hash = state.vault().hash(&request.password)?;

    // The raw token goes into the email link; only its hash is stored.
    let token = tokens::generate_token()?;
    let token_hash = tokens::hash_token(&token);

    let account = match insert_account(&pool, &email, &password_hash, &token_hash).await? {
        SignupOutcome::Created(account) => account,
        SignupOutcome::Conflict => {
            return Err(ApiError::Conflict("email already registered".to_string()))
        }
    };

    // Fire-and-forget, strictly after the insert committed.
    let verify_url = build_verify_url(state.config().frontend_base_url(), &token);
    state.notifier().notify(
        EmailKind::Verification,
        &account.email,
        &json!({ "verify_url": verify_url }),
    );

    Ok((StatusCode::CREATED, Json(PublicUser::from(&account))))
}

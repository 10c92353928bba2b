//! Login and bearer-token issuance.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::Duration;
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::error::{ApiError, FieldError};
use crate::api::handlers::normalize_email;
use crate::api::handlers::types::{LoginRequest, LoginResponse, PublicUser};
use crate::api::state::AppState;
use crate::api::storage::{lookup_by_email, record_login};

// Verified against when the email is unknown so both failure paths do
// comparable work.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$MDEyMzQ1Njc4OWFiY2RlZg$GPDMYn3M0JeBh2KCNeDVhvTWZSJKi6Iv1OUj1C0nVU0";

/// Authenticate with email + password and mint a bearer token.
///
/// Unverified accounts are rejected with a machine-readable
/// `email_verification_required` code, distinct from wrong credentials.
#[utoipa::path(
    post,
    path = "/auth/token",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Wrong credentials"),
        (status = 403, description = "Email verification required")
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginRequest>>,
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
    let account = lookup_by_email(&pool, &email).await?;

    let Some(account) = account else {
        // Burn a verification anyway; unknown email and wrong password are
        // indistinguishable to the caller.
        let _ = state.vault().verify(&request.password, DUMMY_HASH);
        return Err(ApiError::AuthenticationFailed);
    };

    if !state
        .vault()
        .verify(&request.password, &account.password_hash)
        || !account.is_active
    {
        return Err(ApiError::AuthenticationFailed);
    }

    if !account.email_verified {
        return Err(ApiError::verification_required());
    }

    let account = record_login(&pool, account.id).await?;

    let token = state.issuer().issue(
        &account.email,
        account.id,
        Duration::seconds(state.config().session_ttl_seconds()),
    )?;

    let response = LoginResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: PublicUser::from(&account),
    };
    Ok((StatusCode::OK, Json(response)))
}

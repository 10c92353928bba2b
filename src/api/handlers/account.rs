//! Authenticated account views and deletion.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::handlers::authenticate;
use crate::api::handlers::types::PublicUser;
use crate::api::state::AppState;
use crate::api::storage;

/// Return the calling account's own profile and login stats.
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current account", body = PublicUser),
        (status = 401, description = "Unauthenticated")
    ),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let account = authenticate(&headers, &pool, &state).await?;
    Ok((StatusCode::OK, Json(PublicUser::from(&account))))
}

/// Delete the calling account together with its owned content records.
#[utoipa::path(
    delete,
    path = "/auth/account",
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Unauthenticated")
    ),
    tag = "auth"
)]
pub async fn delete_account(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let account = authenticate(&headers, &pool, &state).await?;
    storage::delete_account(&pool, account.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

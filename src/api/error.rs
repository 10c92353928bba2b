//! Error taxonomy for the credential subsystem.
//!
//! Wrong password and invalid/expired/malformed bearer tokens are
//! deliberately indistinguishable to callers, as are the token-redemption
//! misses; only caller-fixable problems carry detail.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// A caller-fixable problem with one request field.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    /// Wrong credentials or an unusable bearer token; never says which.
    #[error("authentication failed")]
    AuthenticationFailed,
    /// Authenticated but not allowed; carries a machine-readable code so the
    /// caller can act on it (e.g. prompt for email verification).
    #[error("permission denied: {code}")]
    PermissionDenied { code: &'static str },
    #[error("conflict: {0}")]
    Conflict(String),
    /// Token-redemption miss: wrong, expired, or already consumed, uniformly.
    #[error("invalid or expired token")]
    ExpiredOrInvalid,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Permission failure for login attempts against unverified accounts.
    #[must_use]
    pub const fn verification_required() -> Self {
        Self::PermissionDenied {
            code: "email_verification_required",
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ExpiredOrInvalid => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation(fields) => json!({
                "error": "validation_failed",
                "fields": fields,
            }),
            Self::AuthenticationFailed => json!({ "error": "authentication_failed" }),
            Self::PermissionDenied { code } => json!({
                "error": "permission_denied",
                "code": code,
            }),
            Self::Conflict(message) => json!({
                "error": "conflict",
                "message": message,
            }),
            Self::ExpiredOrInvalid => json!({ "error": "invalid_or_expired_token" }),
            Self::Internal(err) => {
                // Detail stays in the log; the caller gets a generic body.
                error!("Internal error: {err:?}");
                json!({ "error": "internal_error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(
            ApiError::Validation(vec![]).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::AuthenticationFailed.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::verification_required().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Conflict("email already registered".to_string()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::ExpiredOrInvalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn verification_required_carries_machine_code() {
        match ApiError::verification_required() {
            ApiError::PermissionDenied { code } => {
                assert_eq!(code, "email_verification_required");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn field_error_serializes_field_and_message() {
        let field = FieldError::new("password", "must be at least 8 characters");
        let value = serde_json::to_value(&field).ok();
        assert_eq!(
            value,
            Some(json!({
                "field": "password",
                "message": "must be at least 8 characters",
            }))
        );
    }
}

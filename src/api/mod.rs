//! HTTP surface and server bootstrap.

use anyhow::{anyhow, Context, Result};
use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    routing::{delete, get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use url::Url;
use utoipa::OpenApi;

pub mod email;
pub mod error;
pub mod handlers;
pub mod state;
pub mod storage;

pub use state::{AppConfig, AppState};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// OpenAPI document assembled from the route annotations; served at
/// `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::register::register,
        handlers::login::login,
        handlers::verification::verify_email,
        handlers::verification::resend_verification,
        handlers::password::change_password,
        handlers::password::request_password_reset,
        handlers::password::reset_password,
        handlers::account::me,
        handlers::account::delete_account,
        handlers::secret::secret_status,
        handlers::secret::set_secret,
        handlers::secret::delete_secret,
        handlers::secret::test_secret,
    ),
    components(schemas(
        handlers::types::RegisterRequest,
        handlers::types::LoginRequest,
        handlers::types::LoginResponse,
        handlers::types::VerifyEmailRequest,
        handlers::types::ResendVerificationRequest,
        handlers::types::ChangePasswordRequest,
        handlers::types::PasswordResetRequest,
        handlers::types::ResetPasswordRequest,
        handlers::types::SetSecretRequest,
        handlers::types::SecretTestResponse,
        handlers::types::SecretStatusResponse,
        handlers::types::PublicUser,
    )),
    tags(
        (name = "auth", description = "Account lifecycle and credentials"),
        (name = "settings", description = "Stored third-party secret"),
        (name = "health", description = "Liveness")
    )
)]
struct ApiDoc;

async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    axum::Json(ApiDoc::openapi())
}

/// Build the application router against the given pool and state.
#[must_use]
pub fn router(pool: sqlx::PgPool, app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/openapi.json", get(openapi_json))
        .route("/auth/register", post(handlers::register))
        .route("/auth/token", post(handlers::login))
        .route("/auth/verify-email", post(handlers::verify_email))
        .route(
            "/auth/resend-verification",
            post(handlers::resend_verification),
        )
        .route("/auth/change-password", post(handlers::change_password))
        .route(
            "/auth/request-password-reset",
            post(handlers::request_password_reset),
        )
        .route("/auth/reset-password", post(handlers::reset_password))
        .route("/auth/me", get(handlers::me))
        .route("/auth/account", delete(handlers::delete_account))
        .route("/settings/secret-status", get(handlers::secret_status))
        .route(
            "/settings/secret",
            post(handlers::set_secret).delete(handlers::delete_secret),
        )
        .route("/settings/secret/test", post(handlers::test_secret))
        .layer(Extension(pool))
        .layer(Extension(app_state))
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let url = Url::parse(frontend_base_url).context("invalid frontend base URL")?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(anyhow!("frontend base URL has no usable origin"));
    }
    origin
        .ascii_serialization()
        .parse()
        .context("frontend origin is not a valid header value")
}

/// Start the server.
///
/// # Errors
///
/// Returns an error if configuration is unusable, the database is
/// unreachable, or the listener cannot be bound.
pub async fn new(port: u16, dsn: String, config: AppConfig) -> Result<()> {
    // Components are built once here and held for the process lifetime.
    let app_state = Arc::new(AppState::new(config)?);

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let origin = frontend_origin(app_state.config().frontend_base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_origin(AllowOrigin::exact(origin));

    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);
    let app = router(pool, app_state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(
                request_id_header.clone(),
                MakeRequestUuid,
            ))
            .layer(PropagateRequestIdLayer::new(request_id_header))
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;
    info!("Listening on port {port}");

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn frontend_origin_strips_path() {
        let origin = frontend_origin("https://app.example/some/path").unwrap();
        assert_eq!(origin, HeaderValue::from_static("https://app.example"));
    }

    #[test]
    fn frontend_origin_keeps_port() {
        let origin = frontend_origin("http://localhost:3000").unwrap();
        assert_eq!(origin, HeaderValue::from_static("http://localhost:3000"));
    }

    #[test]
    fn frontend_origin_rejects_garbage() {
        assert!(frontend_origin("not a url").is_err());
        assert!(frontend_origin("data:text/plain,hi").is_err());
    }

    #[test]
    fn openapi_document_covers_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/auth/register",
            "/auth/token",
            "/auth/verify-email",
            "/auth/resend-verification",
            "/auth/change-password",
            "/auth/request-password-reset",
            "/auth/reset-password",
            "/auth/me",
            "/auth/account",
            "/settings/secret-status",
            "/settings/secret",
            "/settings/secret/test",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing path: {path}");
        }
    }

    #[test]
    fn openapi_document_serializes() {
        let rendered = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(rendered.contains("\"/auth/token\""));
        assert!(rendered.contains("PublicUser"));
    }
}

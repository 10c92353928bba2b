//! External credential validator client.
//!
//! `SetSecret` calls the validator synchronously before anything is
//! persisted. The call is bounded by a timeout and every failure maps to a
//! normal outcome value; a validator problem must never hang or crash the
//! request.

use reqwest::{Client, StatusCode};
use serde_json::json;
use std::{future::Future, pin::Pin, time::Duration};
use tracing::error;

use crate::APP_USER_AGENT;

/// Validator verdict for a candidate secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Ok,
    AuthInvalid,
    PermissionDenied,
    RateLimited,
    Unknown(String),
}

/// Abstraction over the validator call so handlers can be exercised with a
/// stub.
pub trait CredentialValidator: Send + Sync {
    fn validate<'a>(
        &'a self,
        secret: &'a str,
    ) -> Pin<Box<dyn Future<Output = ValidationOutcome> + Send + 'a>>;
}

/// HTTP validator: POSTs the candidate secret and maps the response status.
#[derive(Debug, Clone)]
pub struct HttpValidator {
    client: Client,
    url: String,
}

impl HttpValidator {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, url })
    }

    async fn validate_inner(&self, secret: &str) -> ValidationOutcome {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "secret": secret }))
            .send()
            .await;

        match response {
            Ok(response) => match response.status() {
                StatusCode::OK | StatusCode::ACCEPTED => ValidationOutcome::Ok,
                StatusCode::UNAUTHORIZED => ValidationOutcome::AuthInvalid,
                StatusCode::FORBIDDEN => ValidationOutcome::PermissionDenied,
                StatusCode::TOO_MANY_REQUESTS => ValidationOutcome::RateLimited,
                status => {
                    error!("Unexpected validator status: {status}");
                    ValidationOutcome::Unknown(format!("unexpected status {status}"))
                }
            },
            Err(err) if err.is_timeout() => {
                error!("Validator call timed out");
                ValidationOutcome::Unknown("timeout".to_string())
            }
            Err(err) => {
                error!("Validator call failed: {err}");
                ValidationOutcome::Unknown(err.to_string())
            }
        }
    }
}

impl CredentialValidator for HttpValidator {
    fn validate<'a>(
        &'a self,
        secret: &'a str,
    ) -> Pin<Box<dyn Future<Output = ValidationOutcome> + Send + 'a>> {
        Box::pin(self.validate_inner(secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedValidator(ValidationOutcome);

    impl CredentialValidator for FixedValidator {
        fn validate<'a>(
            &'a self,
            _secret: &'a str,
        ) -> Pin<Box<dyn Future<Output = ValidationOutcome> + Send + 'a>> {
            let outcome = self.0.clone();
            Box::pin(async move { outcome })
        }
    }

    #[tokio::test]
    async fn trait_object_dispatch_works() {
        let validator: Box<dyn CredentialValidator> =
            Box::new(FixedValidator(ValidationOutcome::RateLimited));
        assert_eq!(
            validator.validate("whatever").await,
            ValidationOutcome::RateLimited
        );
    }

    #[test]
    fn outcome_equality_covers_detail() {
        assert_eq!(
            ValidationOutcome::Unknown("timeout".to_string()),
            ValidationOutcome::Unknown("timeout".to_string())
        );
        assert_ne!(ValidationOutcome::Ok, ValidationOutcome::AuthInvalid);
    }

    #[test]
    fn http_validator_builds_with_timeout() {
        let validator = HttpValidator::new(
            "https://validator.example/check".to_string(),
            Duration::from_secs(5),
        );
        assert!(validator.is_ok());
    }
}

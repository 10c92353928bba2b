//! Outbound email notifications.
//!
//! Every send happens strictly after the owning storage write has committed
//! and is fire-and-forget: the send runs on a spawned task, failures are
//! logged and dropped, and no outcome ever propagates back into the request
//! that triggered it.

use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

/// Notification kinds used by the account lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Verification,
    PasswordReset,
    Welcome,
}

impl EmailKind {
    #[must_use]
    pub const fn template(self) -> &'static str {
        match self {
            Self::Verification => "verify_email",
            Self::PasswordReset => "password_reset",
            Self::Welcome => "welcome",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to_email: String,
    pub template: String,
    pub payload_json: String,
}

/// Email delivery abstraction.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error; errors are logged, never
    /// surfaced.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            template = %message.template,
            payload = %message.payload_json,
            "email send stub"
        );
        Ok(())
    }
}

/// Fire-and-forget dispatcher in front of an [`EmailSender`].
#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn EmailSender>,
}

impl Notifier {
    #[must_use]
    pub fn new(sender: Arc<dyn EmailSender>) -> Self {
        Self { sender }
    }

    /// Queue a notification. Returns immediately; delivery failure is logged
    /// and forgotten.
    pub fn notify(&self, kind: EmailKind, to_email: &str, payload: &Value) {
        let message = EmailMessage {
            to_email: to_email.to_string(),
            template: kind.template().to_string(),
            payload_json: payload.to_string(),
        };
        let sender = Arc::clone(&self.sender);
        tokio::spawn(async move {
            if let Err(err) = sender.send(&message) {
                error!(
                    to_email = %message.to_email,
                    template = %message.template,
                    "Failed to send email: {err}"
                );
            }
        });
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

/// Build the frontend verification link included in outbound emails.
#[must_use]
pub fn build_verify_url(frontend_base_url: &str, token: &str) -> String {
    let base = frontend_base_url.trim_end_matches('/');
    format!("{base}/verify-email?token={token}")
}

/// Build the frontend password-reset link included in outbound emails.
#[must_use]
pub fn build_reset_url(frontend_base_url: &str, token: &str) -> String {
    let base = frontend_base_url.trim_end_matches('/');
    format!("{base}/reset-password?token={token}")
}

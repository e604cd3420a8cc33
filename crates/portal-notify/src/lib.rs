//! Outbound email notifications for the onboarding portal
//!
//! Emails are best-effort: the [`dispatch`] helpers send them after the
//! primary write has been committed, log every failure and never report it
//! back to the request that triggered them.

pub mod dispatch;
pub mod log_mailer;
pub mod smtp;
pub mod templates;

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

pub use dispatch::{deliver, spawn_delivery};
pub use log_mailer::LogMailer;
pub use smtp::{SmtpConfig, SmtpMailer};

/// A fully rendered email ready to hand to a [`Mailer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl EmailMessage {
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        html: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
            text: text.into(),
        }
    }
}

/// Notification errors
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid email address '{0}'")]
    InvalidAddress(String),

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("Failed to render email template: {0}")]
    Render(String),

    #[error("Email transport error: {0}")]
    Transport(String),

    #[error("Email delivery timed out")]
    Timeout,
}

/// Sends rendered emails
#[automock]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifyError>;
}

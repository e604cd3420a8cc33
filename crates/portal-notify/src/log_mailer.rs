use async_trait::async_trait;
use tracing::info;

use crate::{EmailMessage, Mailer, NotifyError};

/// [`Mailer`] that only logs outgoing messages
///
/// Used when no SMTP relay is configured (development, tests).
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifyError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "SMTP not configured, email not sent"
        );
        Ok(())
    }
}

//! SMTP delivery over lettre's async tokio transport

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, error};

use crate::{EmailMessage, Mailer, NotifyError};

/// SMTP connection settings
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender mailbox, e.g. `"Onboarding <onboarding@example.com>"`
    pub from: String,
    /// Upgrade the connection with STARTTLS. Disable only for local relays.
    pub starttls: bool,
    pub timeout: Duration,
}

/// [`Mailer`] backed by an SMTP relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Result<Self, NotifyError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(config.from.clone()))?;

        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| NotifyError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        builder = builder.port(config.port).timeout(Some(config.timeout));

        if let (Some(username), Some(password)) = (config.username, config.password) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        let transport: AsyncSmtpTransport<Tokio1Executor> = builder.build();

        Ok(Self { transport, from })
    }

    fn build_message(&self, message: &EmailMessage) -> Result<Message, NotifyError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(message.to.clone()))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.as_str())
            .multipart(MultiPart::alternative_plain_html(
                message.text.clone(),
                message.html.clone(),
            ))
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), NotifyError> {
        let email = self.build_message(&message)?;

        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !response.is_positive() {
            error!(
                "SMTP relay rejected email to {}: {}",
                message.to,
                response.code()
            );
            return Err(NotifyError::Transport(format!(
                "relay responded with {}",
                response.code()
            )));
        }

        debug!("Email '{}' sent to {}", message.subject, message.to);
        Ok(())
    }
}

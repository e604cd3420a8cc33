//! Best-effort delivery of composed emails

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{EmailMessage, Mailer, NotifyError};

/// Send every message, each bounded by `timeout`
///
/// Failures are logged and skipped. Returns how many messages were accepted
/// by the mailer.
pub async fn deliver(
    mailer: &dyn Mailer,
    messages: Vec<EmailMessage>,
    timeout: Duration,
) -> usize {
    let mut delivered = 0;

    for message in messages {
        let to = message.to.clone();
        let subject = message.subject.clone();

        let result = match tokio::time::timeout(timeout, mailer.send(message)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout),
        };

        match result {
            Ok(()) => {
                debug!("Delivered '{}' to {}", subject, to);
                delivered += 1;
            }
            Err(e) => {
                warn!(
                    to = %to,
                    subject = %subject,
                    "NotificationFailure: {}",
                    e
                );
            }
        }
    }

    delivered
}

/// Run [`deliver`] on a background task so the caller can respond immediately
pub fn spawn_delivery(
    mailer: Arc<dyn Mailer>,
    messages: Vec<EmailMessage>,
    timeout: Duration,
) -> JoinHandle<usize> {
    tokio::spawn(async move { deliver(mailer.as_ref(), messages, timeout).await })
}

//! Business logic behind the HTTP handlers
//!
//! Services own their database handle and return [`crate::error::ApiError`]
//! directly. Services that trigger emails return the composed messages and
//! leave delivery to the caller, which hands them to background delivery
//! once the response is decided.

pub mod accounts;
pub mod dashboard;
pub mod intake;
pub mod support;

pub use accounts::{AccountService, CreatedStaff, IssuedReset, Session};
pub use dashboard::DashboardService;
pub use intake::{IntakeOutcome, IntakeService};
pub use support::SupportService;

use portal_notify::{EmailMessage, NotifyError};
use tracing::warn;

/// Upper bound on identifier re-draws after a collision
pub(crate) const MAX_CODE_ATTEMPTS: usize = 16;

/// Keep a rendered email; a render failure is logged and the email dropped
pub(crate) fn composed(rendered: Result<EmailMessage, NotifyError>) -> Option<EmailMessage> {
    match rendered {
        Ok(message) => Some(message),
        Err(e) => {
            warn!("NotificationFailure: {}", e);
            None
        }
    }
}

//! External issue-tracker integration
//!
//! Support and upgrade requests are mirrored to an issue tracker so that the
//! operations team can work them there. The local record stays the source of
//! truth; everything in this crate is called best-effort.

pub mod jira;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use jira::{JiraClient, JiraConfig};

/// Issue to open in the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub summary: String,
    pub description: String,
    /// Portal priority (`low`, `medium`, `high`, `critical`)
    pub priority: String,
    /// Free-form category, sent as a label
    pub category: String,
    /// `support` or `upgrade`
    pub kind: String,
}

/// Tracker-side view of an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedIssue {
    pub key: String,
    pub id: String,
    pub url: String,
    pub status: String,
    pub summary: Option<String>,
    pub created: Option<String>,
}

/// Issue tracker errors
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Transport failure (connect, timeout, TLS)
    #[error("Tracker HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Tracker answered with a non-success status
    #[error("Tracker returned status {0}: {1}")]
    Status(u16, String),

    /// Response body did not have the expected shape
    #[error("Unexpected tracker response: {0}")]
    Decode(String),
}

#[automock]
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn create_issue(&self, issue: NewIssue) -> Result<TrackedIssue, TrackerError>;

    async fn get_issue(&self, key: &str) -> Result<TrackedIssue, TrackerError>;

    /// Most recently created issues in the configured project, newest first
    async fn recent_issues(&self, limit: u32) -> Result<Vec<TrackedIssue>, TrackerError>;
}

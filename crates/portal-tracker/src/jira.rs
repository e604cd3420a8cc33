//! Jira REST v2 client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{IssueTracker, NewIssue, TrackedIssue, TrackerError};

/// Status reported for an issue the tracker has just accepted
pub const INITIAL_STATUS: &str = "Open";

const ISSUE_FIELDS: &str = "status,summary,created";

/// Connection settings for a Jira-compatible tracker
#[derive(Debug, Clone)]
pub struct JiraConfig {
    /// Base URL, e.g. `"https://acme.atlassian.net"`
    pub base_url: String,
    pub username: String,
    pub api_token: String,
    /// Project key new issues are filed under
    pub project_key: String,
    /// Issue type for support requests
    pub issue_type: String,
    pub timeout: Duration,
}

/// [`IssueTracker`] backed by the Jira REST v2 API with basic auth
#[derive(Debug, Clone)]
pub struct JiraClient {
    config: JiraConfig,
    http: Client,
}

impl JiraClient {
    pub fn new(mut config: JiraConfig) -> Result<Self, TrackerError> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { config, http })
    }

    /// Browser URL of an issue
    pub fn issue_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.config.base_url, key)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/rest/api/2/{}", self.config.base_url, path)
    }

    fn create_body(&self, issue: &NewIssue) -> Value {
        let issue_type = if issue.kind == "upgrade" {
            "Improvement"
        } else {
            self.config.issue_type.as_str()
        };

        json!({
            "fields": {
                "project": { "key": self.config.project_key },
                "summary": issue.summary,
                "description": issue.description,
                "issuetype": { "name": issue_type },
                "priority": { "name": jira_priority(&issue.priority) },
                "labels": [label(&issue.category), label(&issue.kind)],
            }
        })
    }

    fn into_tracked(&self, issue: WireIssue) -> TrackedIssue {
        let fields = issue.fields.unwrap_or_default();
        TrackedIssue {
            url: self.issue_url(&issue.key),
            key: issue.key,
            id: issue.id,
            status: fields
                .status
                .map(|s| s.name)
                .unwrap_or_else(|| INITIAL_STATUS.to_string()),
            summary: fields.summary,
            created: fields.created,
        }
    }
}

async fn check_status(response: Response) -> Result<Response, TrackerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(TrackerError::Status(status.as_u16(), body))
}

async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, TrackerError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| TrackerError::Decode(e.to_string()))
}

/// Map a portal priority onto Jira's default priority scheme
pub fn jira_priority(priority: &str) -> &'static str {
    match priority.trim().to_ascii_lowercase().as_str() {
        "low" => "Low",
        "high" => "High",
        "critical" | "urgent" => "Highest",
        _ => "Medium",
    }
}

/// Jira labels may not contain spaces
fn label(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_ascii_lowercase()
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    id: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct WireIssue {
    id: String,
    key: String,
    fields: Option<WireFields>,
}

#[derive(Debug, Default, Deserialize)]
struct WireFields {
    status: Option<WireStatus>,
    summary: Option<String>,
    created: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    issues: Vec<WireIssue>,
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn create_issue(&self, issue: NewIssue) -> Result<TrackedIssue, TrackerError> {
        let response = self
            .http
            .post(self.api_url("issue"))
            .basic_auth(&self.config.username, Some(&self.config.api_token))
            .json(&self.create_body(&issue))
            .send()
            .await?;

        let created: CreatedIssue = decode(check_status(response).await?).await?;
        debug!("Created tracker issue {}", created.key);

        Ok(TrackedIssue {
            url: self.issue_url(&created.key),
            key: created.key,
            id: created.id,
            status: INITIAL_STATUS.to_string(),
            summary: Some(issue.summary),
            created: None,
        })
    }

    async fn get_issue(&self, key: &str) -> Result<TrackedIssue, TrackerError> {
        let response = self
            .http
            .get(self.api_url(&format!("issue/{key}")))
            .basic_auth(&self.config.username, Some(&self.config.api_token))
            .query(&[("fields", ISSUE_FIELDS)])
            .send()
            .await?;

        let issue: WireIssue = decode(check_status(response).await?).await?;
        Ok(self.into_tracked(issue))
    }

    async fn recent_issues(&self, limit: u32) -> Result<Vec<TrackedIssue>, TrackerError> {
        let jql = format!(
            "project = {} ORDER BY created DESC",
            self.config.project_key
        );
        let max_results = limit.to_string();

        let response = self
            .http
            .get(self.api_url("search"))
            .basic_auth(&self.config.username, Some(&self.config.api_token))
            .query(&[
                ("jql", jql.as_str()),
                ("maxResults", max_results.as_str()),
                ("fields", ISSUE_FIELDS),
            ])
            .send()
            .await?;

        let result: SearchResult = decode(check_status(response).await?).await?;
        Ok(result
            .issues
            .into_iter()
            .map(|issue| self.into_tracked(issue))
            .collect())
    }
}

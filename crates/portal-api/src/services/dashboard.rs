//! Dashboard aggregates
//!
//! Counts always come from the database. Recent issues come from the tracker
//! when it answers and from the locally mirrored references otherwise.

use std::collections::BTreeMap;
use std::sync::Arc;

use portal_auth::Role;
use portal_db::entities::{account, onboarding_submission, support_request};
use portal_tracker::{IssueTracker, TrackedIssue};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use tracing::{debug, warn};

use crate::{
    error::ApiError,
    middleware::AuthUser,
    models::{
        AdminDashboard, IssueSummary, OnboardingRecord, StaffCounts, SupportRequestView,
        UserDashboard, LOCAL_STATUS,
    },
};

const RECENT_SUBMISSIONS: u64 = 5;
const RECENT_ISSUES: u32 = 10;
const RECENT_REQUESTS: usize = 5;

#[derive(Clone)]
pub struct DashboardService {
    db: DatabaseConnection,
    tracker: Option<Arc<dyn IssueTracker>>,
}

impl DashboardService {
    pub fn new(db: DatabaseConnection, tracker: Option<Arc<dyn IssueTracker>>) -> Self {
        Self { db, tracker }
    }

    pub async fn admin_summary(&self) -> Result<AdminDashboard, ApiError> {
        let customers = onboarding_submission::Entity::find().count(&self.db).await?;

        // Grouped rather than filtered so legacy role spellings still parse
        let accounts_by_role: Vec<(String, bool, i64)> = account::Entity::find()
            .select_only()
            .column(account::Column::Role)
            .column(account::Column::IsActive)
            .column_as(account::Column::Id.count(), "accounts")
            .group_by(account::Column::Role)
            .group_by(account::Column::IsActive)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut staff = StaffCounts::default();
        for (role, is_active, accounts) in accounts_by_role {
            if Role::parse(&role).is_ok_and(|role| role == Role::Customer) {
                continue;
            }
            let accounts = accounts.max(0) as u64;
            staff.total += accounts;
            if is_active {
                staff.active += accounts;
            } else {
                staff.inactive += accounts;
            }
        }

        let by_status: Vec<(Option<String>, i64)> = support_request::Entity::find()
            .select_only()
            .column(support_request::Column::TrackerStatus)
            .column_as(support_request::Column::Id.count(), "requests")
            .group_by(support_request::Column::TrackerStatus)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut requests_by_status = BTreeMap::new();
        let mut support_requests = 0;
        for (status, requests) in by_status {
            let requests = requests.max(0) as u64;
            support_requests += requests;
            *requests_by_status
                .entry(status.unwrap_or_else(|| LOCAL_STATUS.to_string()))
                .or_insert(0) += requests;
        }

        let recent_submissions = onboarding_submission::Entity::find()
            .order_by_desc(onboarding_submission::Column::CreatedAt)
            .limit(RECENT_SUBMISSIONS)
            .all(&self.db)
            .await?
            .into_iter()
            .map(OnboardingRecord::from)
            .collect();

        let (recent_issues, tracker_online) = match &self.tracker {
            Some(tracker) => match tracker.recent_issues(RECENT_ISSUES).await {
                Ok(issues) => (issues.into_iter().map(summary_from_tracked).collect(), true),
                Err(e) => {
                    warn!("Tracker unavailable for admin dashboard: {}", e);
                    (self.recent_local_issues().await?, false)
                }
            },
            None => (self.recent_local_issues().await?, false),
        };

        debug!(
            "Admin dashboard: {} customers, {} staff, {} requests",
            customers, staff.total, support_requests
        );

        Ok(AdminDashboard {
            customers,
            staff,
            support_requests,
            requests_by_status,
            recent_submissions,
            recent_issues,
            tracker_online,
        })
    }

    /// Newest locally mirrored tracker references
    async fn recent_local_issues(&self) -> Result<Vec<IssueSummary>, ApiError> {
        let requests = support_request::Entity::find()
            .filter(support_request::Column::TrackerKey.is_not_null())
            .order_by_desc(support_request::Column::CreatedAt)
            .limit(u64::from(RECENT_ISSUES))
            .all(&self.db)
            .await?;

        Ok(requests.iter().filter_map(summary_from_local).collect())
    }

    pub async fn user_summary(&self, user: &AuthUser) -> Result<UserDashboard, ApiError> {
        let account = account::Entity::find_by_id(user.account_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Account"))?;

        let requests = support_request::Entity::find()
            .filter(support_request::Column::ReporterId.eq(user.account_id))
            .order_by_desc(support_request::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let mut tracker_online = self.tracker.is_some();
        let mut recent_issues = Vec::new();

        for request in requests
            .iter()
            .filter(|r| r.tracker_key.is_some())
            .take(RECENT_REQUESTS)
        {
            let live = match (&self.tracker, request.tracker_key.as_deref()) {
                (Some(tracker), Some(key)) => match tracker.get_issue(key).await {
                    Ok(issue) => Some(summary_from_tracked(issue)),
                    Err(e) => {
                        warn!("Tracker lookup for {} failed: {}", key, e);
                        tracker_online = false;
                        None
                    }
                },
                _ => None,
            };

            if let Some(summary) = live.or_else(|| summary_from_local(request)) {
                recent_issues.push(summary);
            }
        }

        Ok(UserDashboard {
            user: account.into(),
            support_requests: requests.len() as u64,
            requests_by_status: count_by_status(&requests),
            recent_requests: requests
                .iter()
                .take(RECENT_REQUESTS)
                .cloned()
                .map(SupportRequestView::from)
                .collect(),
            recent_issues,
            tracker_online,
        })
    }
}

fn count_by_status(requests: &[support_request::Model]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for request in requests {
        let status = request
            .tracker_status
            .clone()
            .unwrap_or_else(|| LOCAL_STATUS.to_string());
        *counts.entry(status).or_insert(0) += 1;
    }
    counts
}

fn summary_from_tracked(issue: TrackedIssue) -> IssueSummary {
    IssueSummary {
        key: issue.key,
        url: Some(issue.url),
        status: issue.status,
        summary: issue.summary,
        created: issue.created,
    }
}

fn summary_from_local(request: &support_request::Model) -> Option<IssueSummary> {
    Some(IssueSummary {
        key: request.tracker_key.clone()?,
        url: request.tracker_url.clone(),
        status: request
            .tracker_status
            .clone()
            .unwrap_or_else(|| LOCAL_STATUS.to_string()),
        summary: Some(request.subject.clone()),
        created: Some(request.created_at.to_rfc3339()),
    })
}

//! Support and upgrade requests
//!
//! The local row is written first and is authoritative. Mirroring to the
//! issue tracker happens afterwards and only ever adds the tracker reference;
//! a tracker outage leaves the request in the portal with no reference.

use std::sync::Arc;

use chrono::Utc;
use portal_auth::{is_valid_code, Role, CUSTOMER_ID_PREFIX};
use portal_db::entities::{account, onboarding_submission, support_request};
use portal_tracker::{IssueTracker, NewIssue, TrackedIssue};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{error::ApiError, middleware::AuthUser, models::CreateSupportRequest, validation::clean};

pub const KINDS: [&str; 2] = ["support", "upgrade"];
pub const PRIORITIES: [&str; 4] = ["low", "medium", "high", "critical"];
const DEFAULT_CATEGORY: &str = "general";

#[derive(Clone)]
pub struct SupportService {
    db: DatabaseConnection,
    tracker: Option<Arc<dyn IssueTracker>>,
}

impl SupportService {
    pub fn new(db: DatabaseConnection, tracker: Option<Arc<dyn IssueTracker>>) -> Self {
        Self { db, tracker }
    }

    /// File a request for `reporter` and mirror it to the tracker
    pub async fn create(
        &self,
        reporter: &account::Model,
        request: CreateSupportRequest,
    ) -> Result<support_request::Model, ApiError> {
        let kind = pick("kind", request.kind.as_deref(), &KINDS, "support")?;
        let priority = pick("priority", request.priority.as_deref(), &PRIORITIES, "medium")?;

        let subject = request.subject.trim().to_string();
        let description = request.description.trim().to_string();
        let mut missing = Vec::new();
        if subject.is_empty() {
            missing.push("subject".to_string());
        }
        if description.is_empty() {
            missing.push("description".to_string());
        }
        if !missing.is_empty() {
            return Err(ApiError::MissingRequiredFields(missing));
        }

        let customer_id = match clean(request.customer_id) {
            Some(raw) => {
                let id = raw.to_uppercase();
                if !is_valid_code(CUSTOMER_ID_PREFIX, &id) {
                    return Err(ApiError::validation(
                        "customerId",
                        "Customer ID must look like CS-XXXXXXXX",
                    ));
                }
                Some(id)
            }
            None if Role::parse(&reporter.role).is_ok_and(|role| role == Role::Customer) => {
                self.submission_for(&reporter.email).await?
            }
            None => None,
        };

        let category = clean(request.category)
            .map(|c| c.to_lowercase())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        let now = Utc::now();
        let record = support_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            kind: Set(kind),
            reporter_id: Set(reporter.id),
            reporter_name: Set(reporter.full_name.clone()),
            reporter_email: Set(reporter.email.clone()),
            customer_id: Set(customer_id),
            subject: Set(subject),
            description: Set(description),
            priority: Set(priority),
            category: Set(category),
            attachment: Set(clean(request.attachment)),
            tracker_key: Set(None),
            tracker_id: Set(None),
            tracker_url: Set(None),
            tracker_status: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!(
            "Support request {} ({}) filed by {}",
            record.id, record.kind, record.reporter_email
        );

        Ok(self.mirror(record).await)
    }

    /// Customer id of the onboarding submission filed under `email`
    async fn submission_for(&self, email: &str) -> Result<Option<String>, ApiError> {
        let submission = onboarding_submission::Entity::find()
            .filter(
                Condition::any()
                    .add(onboarding_submission::Column::CompanyEmail.eq(email))
                    .add(onboarding_submission::Column::ContactEmail.eq(email)),
            )
            .order_by_asc(onboarding_submission::Column::CreatedAt)
            .one(&self.db)
            .await?;

        Ok(submission.map(|s| s.customer_id))
    }

    async fn mirror(&self, record: support_request::Model) -> support_request::Model {
        let Some(tracker) = &self.tracker else {
            debug!("No issue tracker configured, request {} stays local", record.id);
            return record;
        };

        let issue = NewIssue {
            summary: format!("[{}] {}", record.kind, record.subject),
            description: tracker_description(&record),
            priority: record.priority.clone(),
            category: record.category.clone(),
            kind: record.kind.clone(),
        };

        let tracked = match tracker.create_issue(issue).await {
            Ok(tracked) => tracked,
            Err(e) => {
                warn!(
                    "NotificationFailure: could not mirror support request {} to the tracker: {}",
                    record.id, e
                );
                return record;
            }
        };

        let fallback = record.clone();
        match apply_tracked(record, &tracked).update(&self.db).await {
            Ok(updated) => {
                info!("Support request {} mirrored as {}", updated.id, tracked.key);
                updated
            }
            Err(e) => {
                warn!(
                    "Support request {} mirrored as {} but the reference was not stored: {}",
                    fallback.id, tracked.key, e
                );
                fallback
            }
        }
    }

    /// Requests visible to `user`, newest first
    ///
    /// Staff and above see every request; other accounts only their own.
    pub async fn list(&self, user: &AuthUser) -> Result<Vec<support_request::Model>, ApiError> {
        let mut query =
            support_request::Entity::find().order_by_desc(support_request::Column::CreatedAt);
        if !user.role.satisfies(Role::Staff) {
            query = query.filter(support_request::Column::ReporterId.eq(user.account_id));
        }

        Ok(query.all(&self.db).await?)
    }

    /// Fetch one request, refreshing its tracker status when possible
    ///
    /// A request filed by someone else is reported as missing to non-staff.
    pub async fn get(
        &self,
        user: &AuthUser,
        id: Uuid,
    ) -> Result<support_request::Model, ApiError> {
        let record = support_request::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .filter(|r| r.reporter_id == user.account_id || user.role.satisfies(Role::Staff))
            .ok_or_else(|| ApiError::not_found("Support request"))?;

        let (Some(tracker), Some(key)) = (&self.tracker, record.tracker_key.clone()) else {
            return Ok(record);
        };

        match tracker.get_issue(&key).await {
            Ok(tracked) if record.tracker_status.as_deref() != Some(tracked.status.as_str()) => {
                let mut active = record.clone().into_active_model();
                active.tracker_status = Set(Some(tracked.status.clone()));
                active.updated_at = Set(Utc::now());
                match active.update(&self.db).await {
                    Ok(updated) => Ok(updated),
                    Err(e) => {
                        warn!("Could not store refreshed status for {}: {}", key, e);
                        Ok(record)
                    }
                }
            }
            Ok(_) => Ok(record),
            Err(e) => {
                warn!("Tracker status refresh for {} failed: {}", key, e);
                Ok(record)
            }
        }
    }
}

fn pick(
    field: &str,
    raw: Option<&str>,
    allowed: &[&str],
    default: &str,
) -> Result<String, ApiError> {
    let Some(value) = raw.map(|v| v.trim().to_lowercase()).filter(|v| !v.is_empty()) else {
        return Ok(default.to_string());
    };

    if allowed.contains(&value.as_str()) {
        Ok(value)
    } else {
        Err(ApiError::validation(
            field,
            format!("Must be one of: {}", allowed.join(", ")),
        ))
    }
}

fn tracker_description(record: &support_request::Model) -> String {
    let mut description = format!(
        "Reported by {} <{}>\n",
        record.reporter_name.as_deref().unwrap_or("portal user"),
        record.reporter_email
    );
    if let Some(customer_id) = &record.customer_id {
        description.push_str(&format!("Customer: {}\n", customer_id));
    }
    if let Some(attachment) = &record.attachment {
        description.push_str(&format!("Attachment: {}\n", attachment));
    }
    description.push('\n');
    description.push_str(&record.description);
    description
}

fn apply_tracked(
    record: support_request::Model,
    tracked: &TrackedIssue,
) -> support_request::ActiveModel {
    let mut active = record.into_active_model();
    active.tracker_key = Set(Some(tracked.key.clone()));
    active.tracker_id = Set(Some(tracked.id.clone()));
    active.tracker_url = Set(Some(tracked.url.clone()));
    active.tracker_status = Set(Some(tracked.status.clone()));
    active.updated_at = Set(Utc::now());
    active
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_tracker::{MockIssueTracker, TrackerError};

    async fn setup() -> (DatabaseConnection, account::Model, account::Model) {
        let db = portal_db::connect("sqlite::memory:").await.unwrap();
        portal_db::migrate(&db).await.unwrap();

        let customer = insert_account(&db, "buyer@client.test", "customer", "ST-AAAA1111").await;
        let staff = insert_account(&db, "ops@portal.test", "staff", "ST-BBBB2222").await;
        (db, customer, staff)
    }

    async fn insert_account(
        db: &DatabaseConnection,
        email: &str,
        role: &str,
        code: &str,
    ) -> account::Model {
        let now = Utc::now();
        account::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            password_hash: Set("unused".to_string()),
            full_name: Set(Some("Pat".to_string())),
            phone: Set(None),
            avatar_url: Set(None),
            company_name: Set(None),
            account_code: Set(code.to_string()),
            role: Set(role.to_string()),
            is_active: Set(true),
            must_change_password: Set(false),
            reset_token_hash: Set(None),
            reset_token_expires_at: Set(None),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap()
    }

    async fn insert_submission(db: &DatabaseConnection, customer_id: &str, company_email: &str) {
        let now = Utc::now();
        onboarding_submission::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id.to_string()),
            company_name: Set("Client Co".to_string()),
            company_email: Set(company_email.to_string()),
            contact_name: Set(None),
            contact_phone: Set(None),
            contact_email: Set(None),
            secondary_contact_name: Set(None),
            secondary_contact_phone: Set(None),
            secondary_contact_email: Set(None),
            number_of_accounts: Set(1),
            aliases: Set("{}".to_string()),
            other_aliases: Set(None),
            agree: Set(true),
            acknowledge: Set(true),
            confirm: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap();
    }

    fn auth(account: &account::Model) -> AuthUser {
        AuthUser {
            account_id: account.id,
            email: account.email.clone(),
            role: Role::parse(&account.role).unwrap(),
            must_change_password: false,
        }
    }

    fn request(subject: &str) -> CreateSupportRequest {
        CreateSupportRequest {
            subject: subject.to_string(),
            description: "Cannot reach the console".to_string(),
            priority: Some("HIGH".to_string()),
            ..Default::default()
        }
    }

    fn tracked(key: &str, status: &str) -> TrackedIssue {
        TrackedIssue {
            key: key.to_string(),
            id: "10001".to_string(),
            url: format!("https://tracker.test/browse/{}", key),
            status: status.to_string(),
            summary: None,
            created: None,
        }
    }

    #[tokio::test]
    async fn test_create_mirrors_to_tracker() {
        let (db, customer, _) = setup().await;
        insert_submission(&db, "CS-AAAA1111", "buyer@client.test").await;
        let mut tracker = MockIssueTracker::new();
        tracker
            .expect_create_issue()
            .withf(|issue| issue.priority == "high" && issue.kind == "support")
            .times(1)
            .returning(|_| Ok(tracked("OPS-1", "Open")));

        let service = SupportService::new(db, Some(Arc::new(tracker)));
        let created = service.create(&customer, request("Login broken")).await.unwrap();

        assert_eq!(created.tracker_key.as_deref(), Some("OPS-1"));
        assert_eq!(created.tracker_status.as_deref(), Some("Open"));
        assert_eq!(created.customer_id.as_deref(), Some("CS-AAAA1111"));
        assert_eq!(created.category, "general");
    }

    #[tokio::test]
    async fn test_customer_without_submission_has_no_customer_id() {
        let (db, customer, _) = setup().await;
        insert_submission(&db, "CS-ZZZZ9999", "someone-else@client.test").await;
        let service = SupportService::new(db, None);

        let created = service.create(&customer, request("Billing")).await.unwrap();

        assert!(created.customer_id.is_none());
    }

    #[tokio::test]
    async fn test_tracker_failure_keeps_local_record() {
        let (db, customer, _) = setup().await;
        let mut tracker = MockIssueTracker::new();
        tracker
            .expect_create_issue()
            .returning(|_| Err(TrackerError::Status(503, "down".to_string())));

        let service = SupportService::new(db, Some(Arc::new(tracker)));
        let created = service.create(&customer, request("Login broken")).await.unwrap();

        assert!(created.tracker_key.is_none());
        let stored = service.list(&auth(&customer)).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, created.id);
    }

    #[tokio::test]
    async fn test_create_validates_kind_and_required_fields() {
        let (db, customer, _) = setup().await;
        let service = SupportService::new(db, None);

        let mut bad_kind = request("x");
        bad_kind.kind = Some("refund".to_string());
        assert!(matches!(
            service.create(&customer, bad_kind).await,
            Err(ApiError::Validation { field, .. }) if field == "kind"
        ));

        let err = service.create(&customer, request("  ")).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingRequiredFields(fields) if fields == ["subject"]));
    }

    #[tokio::test]
    async fn test_customers_only_see_their_own_requests() {
        let (db, customer, staff) = setup().await;
        let other = insert_account(&db, "other@client.test", "customer", "ST-CCCC3333").await;
        let service = SupportService::new(db, None);

        let mine = service.create(&customer, request("Mine")).await.unwrap();
        let theirs = service.create(&other, request("Theirs")).await.unwrap();

        let visible = service.list(&auth(&customer)).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, mine.id);
        assert_eq!(service.list(&auth(&staff)).await.unwrap().len(), 2);

        assert!(matches!(
            service.get(&auth(&customer), theirs.id).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(service.get(&auth(&staff), theirs.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_refreshes_tracker_status() {
        let (db, customer, _) = setup().await;
        let mut tracker = MockIssueTracker::new();
        tracker
            .expect_create_issue()
            .returning(|_| Ok(tracked("OPS-7", "Open")));
        tracker
            .expect_get_issue()
            .withf(|key| key == "OPS-7")
            .returning(|_| Ok(tracked("OPS-7", "In Progress")));

        let service = SupportService::new(db, Some(Arc::new(tracker)));
        let created = service.create(&customer, request("Slow")).await.unwrap();

        let fetched = service.get(&auth(&customer), created.id).await.unwrap();
        assert_eq!(fetched.tracker_status.as_deref(), Some("In Progress"));
    }
}

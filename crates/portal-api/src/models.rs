use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use portal_auth::Role;
use portal_db::entities::{account, onboarding_submission, support_request};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,
    /// Machine-readable error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Offending field for validation and duplicate errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Offending value for duplicate errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Generic acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// API version
    pub version: String,
    /// Database reachability ("ok" or "unavailable")
    pub database: String,
}

// ---------------------------------------------------------------------------
// Onboarding
// ---------------------------------------------------------------------------

/// Company and contact step of the wizard
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyInfo {
    pub company_name: Option<String>,
    pub company_email: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub secondary_contact_name: Option<String>,
    pub secondary_contact_phone: Option<String>,
    pub secondary_contact_email: Option<String>,
}

/// AWS setup step of the wizard
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AwsSetup {
    /// Number of AWS accounts requested
    pub number_of_accounts: i32,
    /// Alias key (`A`..`F`, ...) to organization or department name
    pub aliases: BTreeMap<String, String>,
    /// Free-text aliases that did not fit the keyed map
    pub other_aliases: Option<String>,
}

/// Consents collected on the last wizard step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Agreements {
    /// General agreement
    pub agree: bool,
    /// Data-residency acknowledgment
    pub acknowledge: bool,
    /// No prohibited content
    pub confirm: bool,
}

impl Agreements {
    pub fn all_accepted(&self) -> bool {
        self.agree && self.acknowledge && self.confirm
    }
}

/// Onboarding submission payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
    pub company_info: Option<CompanyInfo>,
    pub aws_setup: Option<AwsSetup>,
    #[serde(default)]
    pub agreements: Agreements,
}

/// Returned when a submission is accepted
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingCreated {
    pub message: String,
    /// Generated customer identifier (`CS-XXXXXXXX`)
    pub customer_id: String,
}

/// Stored onboarding submission
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRecord {
    pub customer_id: String,
    pub company_info: CompanyInfo,
    pub aws_setup: AwsSetup,
    pub agreements: Agreements,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<onboarding_submission::Model> for OnboardingRecord {
    fn from(model: onboarding_submission::Model) -> Self {
        let aliases = serde_json::from_str(&model.aliases).unwrap_or_default();

        Self {
            customer_id: model.customer_id,
            company_info: CompanyInfo {
                company_name: Some(model.company_name),
                company_email: Some(model.company_email),
                contact_name: model.contact_name,
                contact_phone: model.contact_phone,
                contact_email: model.contact_email,
                secondary_contact_name: model.secondary_contact_name,
                secondary_contact_phone: model.secondary_contact_phone,
                secondary_contact_email: model.secondary_contact_email,
            },
            aws_setup: AwsSetup {
                number_of_accounts: model.number_of_accounts,
                aliases,
                other_aliases: model.other_aliases,
            },
            agreements: Agreements {
                agree: model.agree,
                acknowledge: model.acknowledge,
                confirm: model.confirm,
            },
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Page of onboarding submissions, newest first
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingList {
    pub submissions: Vec<OnboardingRecord>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Company lookup query
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct CompanyLookupQuery {
    /// Company email (case-insensitive)
    pub email: String,
}

/// Pagination query
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// 1-based page number (default: 1)
    pub page: Option<u64>,
    /// Page size (default: 20, max: 100)
    pub per_page: Option<u64>,
}

/// Contact fields that may change after intake
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactRequest {
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Account as exposed over the API (never includes credentials)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// Human-readable identifier (`ST-XXXXXXXX`)
    pub account_code: String,
    /// Canonical role (`super_admin`, `admin`, `staff`, `customer`)
    pub role: String,
    pub is_active: bool,
    pub must_change_password: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<account::Model> for UserView {
    fn from(model: account::Model) -> Self {
        let role = Role::parse(&model.role)
            .map(|role| role.as_str().to_string())
            .unwrap_or(model.role);

        Self {
            id: model.id.to_string(),
            email: model.email,
            full_name: model.full_name,
            phone: model.phone,
            avatar_url: model.avatar_url,
            company_name: model.company_name,
            account_code: model.account_code,
            role,
            is_active: model.is_active,
            must_change_password: model.must_change_password,
            last_login_at: model.last_login_at,
            created_at: model.created_at,
        }
    }
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Session token (also set as the `session_token` cookie)
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
    /// The account must change its password before using the portal
    pub must_change_password: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(alias = "password")]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Create a staff (or customer) account
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaffRequest {
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    /// Role name in any common spelling (default: `staff`)
    pub role: Option<String>,
    /// Initial password; generated when omitted
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaffResponse {
    pub staff: UserView,
    /// Present only when the portal generated the initial password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStaffRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StaffList {
    pub staff: Vec<UserView>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Support requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupportRequest {
    /// `support` (default) or `upgrade`
    pub kind: Option<String>,
    pub subject: String,
    pub description: String,
    /// `low`, `medium` (default), `high` or `critical`
    pub priority: Option<String>,
    pub category: Option<String>,
    pub customer_id: Option<String>,
    /// Reference to a previously uploaded file
    pub attachment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupportRequestView {
    pub id: String,
    pub kind: String,
    pub reporter_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_name: Option<String>,
    pub reporter_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    pub subject: String,
    pub description: String,
    pub priority: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_url: Option<String>,
    /// Last known tracker status, or `Submitted` when not mirrored
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status shown for requests that never reached the tracker
pub const LOCAL_STATUS: &str = "Submitted";

impl From<support_request::Model> for SupportRequestView {
    fn from(model: support_request::Model) -> Self {
        Self {
            id: model.id.to_string(),
            kind: model.kind,
            reporter_id: model.reporter_id.to_string(),
            reporter_name: model.reporter_name,
            reporter_email: model.reporter_email,
            customer_id: model.customer_id,
            subject: model.subject,
            description: model.description,
            priority: model.priority,
            category: model.category,
            attachment: model.attachment,
            tracker_key: model.tracker_key,
            tracker_url: model.tracker_url,
            status: model
                .tracker_status
                .unwrap_or_else(|| LOCAL_STATUS.to_string()),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SupportRequestList {
    pub requests: Vec<SupportRequestView>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Dashboards
// ---------------------------------------------------------------------------

/// Issue as listed on a dashboard
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueSummary {
    pub key: String,
    pub url: Option<String>,
    pub status: String,
    pub summary: Option<String>,
    pub created: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StaffCounts {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    /// Number of onboarded customers
    pub customers: u64,
    pub staff: StaffCounts,
    pub support_requests: u64,
    /// Support requests grouped by last known status
    pub requests_by_status: BTreeMap<String, u64>,
    pub recent_submissions: Vec<OnboardingRecord>,
    pub recent_issues: Vec<IssueSummary>,
    /// Whether `recentIssues` came from the live tracker
    pub tracker_online: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDashboard {
    pub user: UserView,
    pub support_requests: u64,
    pub requests_by_status: BTreeMap<String, u64>,
    pub recent_requests: Vec<SupportRequestView>,
    pub recent_issues: Vec<IssueSummary>,
    pub tracker_online: bool,
}

//! End-to-end tests against the assembled router
//!
//! Every test builds the full router over an in-memory SQLite database and
//! drives it with `oneshot` requests.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use portal_api::{ApiServer, ApiServerConfig, AppState};
use portal_auth::{is_valid_code, CUSTOMER_ID_PREFIX};
use portal_db::entities::account;
use portal_notify::{LogMailer, Mailer, MockMailer, NotifyError};
use portal_tracker::{IssueTracker, MockIssueTracker, TrackerError};
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use serde_json::{json, Value};
use tower::ServiceExt; // For oneshot()

const ADMIN_EMAIL: &str = "root@portal.test";
const ADMIN_PASSWORD: &str = "Admin#Pass123";

struct TestApp {
    router: Router,
    state: Arc<AppState>,
}

impl TestApp {
    async fn new() -> Self {
        Self::with(Arc::new(LogMailer), None).await
    }

    async fn with(mailer: Arc<dyn Mailer>, tracker: Option<Arc<dyn IssueTracker>>) -> Self {
        let db = portal_db::connect("sqlite::memory:").await.unwrap();
        portal_db::migrate(&db).await.unwrap();

        let config = ApiServerConfig {
            jwt_secret: "integration-test-secret".to_string(),
            ..Default::default()
        };
        let server = ApiServer::new(config, db, mailer, tracker);

        Self {
            router: server.build_router(),
            state: server.state(),
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value, HeaderMap) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, value, headers)
    }

    async fn bootstrap_admin(&self) -> account::Model {
        self.state
            .accounts
            .bootstrap_admin(ADMIN_EMAIL, ADMIN_PASSWORD, Some("Root".to_string()))
            .await
            .unwrap()
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        let (status, body, _) = self
            .send(
                Method::POST,
                "/api/auth/login",
                Some(json!({ "email": email, "password": password })),
                None,
            )
            .await;
        (status, body)
    }

    async fn admin_token(&self) -> String {
        self.bootstrap_admin().await;
        let (status, body) = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    /// Create a staff account with a generated password and log it in
    async fn staff_session(&self, admin_token: &str, email: &str) -> (String, String, String) {
        let (status, body, _) = self
            .send(
                Method::POST,
                "/api/admin/staff",
                Some(json!({ "email": email, "fullName": "Sam Staff" })),
                Some(admin_token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        let id = body["staff"]["id"].as_str().unwrap().to_string();
        let password = body["temporaryPassword"].as_str().unwrap().to_string();
        let (status, body) = self.login(email, &password).await;
        assert_eq!(status, StatusCode::OK);

        (id, password, body["token"].as_str().unwrap().to_string())
    }
}

fn onboarding(email: &str, confirm: bool) -> Value {
    json!({
        "companyInfo": { "companyName": "Acme", "companyEmail": email },
        "awsSetup": { "numberOfAccounts": 2, "aliases": { "A": "sales", "B": "hr" } },
        "agreements": { "agree": true, "acknowledge": true, "confirm": confirm }
    })
}

#[tokio::test]
async fn test_onboarding_then_duplicate_company_email() {
    let app = TestApp::new().await;

    let (status, body, _) = app
        .send(Method::POST, "/api/onboarding", Some(onboarding("ops@acme.test", true)), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let customer_id = body["customerId"].as_str().unwrap();
    assert!(is_valid_code(CUSTOMER_ID_PREFIX, customer_id), "{customer_id}");

    let other_payload = json!({
        "companyInfo": { "companyName": "Acme Holdings", "companyEmail": "OPS@Acme.test" },
        "awsSetup": { "numberOfAccounts": 7 },
        "agreements": { "agree": true, "acknowledge": true, "confirm": true }
    });
    let (status, body, _) = app
        .send(Method::POST, "/api/onboarding", Some(other_payload), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DUPLICATE_ENTRY");
    assert_eq!(body["field"], "companyEmail");

    let token = app.admin_token().await;
    let (status, body, _) = app
        .send(Method::GET, "/api/admin/onboarding", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_onboarding_requires_every_agreement() {
    let app = TestApp::new().await;

    let (status, body, _) = app
        .send(Method::POST, "/api/onboarding", Some(onboarding("ops@acme.test", false)), None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _, _) = app
        .send(Method::GET, "/api/onboarding/company?email=ops@acme.test", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_onboarding_rejects_missing_sections_and_bad_json() {
    let app = TestApp::new().await;

    let (status, body, _) = app
        .send(Method::POST, "/api/onboarding", Some(json!({})), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_REQUIRED_FIELDS");

    let (status, body, _) = app
        .send(
            Method::POST,
            "/api/onboarding",
            Some(json!({ "companyInfo": "not an object" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "body");
}

#[tokio::test]
async fn test_query_and_path_rejections_are_json() {
    let app = TestApp::new().await;

    let (status, body, headers) = app
        .send(Method::GET, "/api/onboarding/company", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));
    assert_eq!(body["field"], "query");
    assert!(body["error"].as_str().unwrap().contains("email"));

    let token = app.admin_token().await;
    let (status, body, headers) = app
        .send(Method::PUT, "/api/admin/staff/not-a-uuid/toggle", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));
    assert_eq!(body["field"], "path");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_mail_failure_does_not_fail_onboarding() {
    let mut mailer = MockMailer::new();
    mailer
        .expect_send()
        .returning(|_| Err(NotifyError::Transport("smtp unreachable".to_string())));
    let app = TestApp::with(Arc::new(mailer), None).await;

    let (status, body, _) = app
        .send(Method::POST, "/api/onboarding", Some(onboarding("ops@acme.test", true)), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let customer_id = body["customerId"].as_str().unwrap().to_string();

    let (status, body, _) = app
        .send(Method::GET, "/api/onboarding/company?email=OPS@acme.test", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customerId"], customer_id);
    assert_eq!(body["awsSetup"]["aliases"]["A"], "sales");
}

#[tokio::test]
async fn test_login_sets_session_cookie_and_me_works() {
    let app = TestApp::new().await;
    app.bootstrap_admin().await;

    let (status, body, headers) = app
        .send(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "ROOT@portal.test", "password": ADMIN_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("session_token="));
    assert!(cookie.contains("HttpOnly"));
    assert_eq!(body["user"]["role"], "super_admin");
    assert_eq!(body["mustChangePassword"], false);

    let token = body["token"].as_str().unwrap();
    let (status, body, _) = app.send(Method::GET, "/api/auth/me", None, Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], ADMIN_EMAIL);
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let app = TestApp::new().await;
    app.bootstrap_admin().await;

    let (unknown_status, unknown) = app.login("nobody@portal.test", ADMIN_PASSWORD).await;
    let (wrong_status, wrong) = app.login(ADMIN_EMAIL, "Wrong#Pass123").await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, wrong);
}

#[tokio::test]
async fn test_first_login_must_change_password() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, temporary, token) = app.staff_session(&admin, "sam@acme.test").await;

    let (status, body, _) = app.send(Method::GET, "/api/dashboard", None, Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "PASSWORD_CHANGE_REQUIRED");

    let (status, _, _) = app.send(Method::GET, "/api/auth/me", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = app
        .send(
            Method::POST,
            "/api/admin/change-password",
            Some(json!({ "oldPassword": "Not#TheOne1", "newPassword": "Fresh#Pass456" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = app
        .send(
            Method::POST,
            "/api/admin/change-password",
            Some(json!({ "oldPassword": temporary, "newPassword": "Fresh#Pass456" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = app.send(Method::GET, "/api/dashboard", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["mustChangePassword"], false);

    let (status, _) = app.login("sam@acme.test", "Fresh#Pass456").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_deactivated_account_is_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (id, temporary, token) = app.staff_session(&admin, "sam@acme.test").await;

    let (status, body, _) = app
        .send(Method::PUT, &format!("/api/admin/staff/{id}/toggle"), None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isActive"], false);

    let (status, body) = app.login("sam@acme.test", &temporary).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ACCOUNT_INACTIVE");

    // Sessions issued before deactivation stop working too
    let (status, _, _) = app.send(Method::GET, "/api/auth/me", None, Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_role_gates() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, temporary, token) = app.staff_session(&admin, "sam@acme.test").await;
    app.send(
        Method::POST,
        "/api/admin/change-password",
        Some(json!({ "oldPassword": temporary, "newPassword": "Fresh#Pass456" })),
        Some(&token),
    )
    .await;

    let (_, body, _) = app
        .send(Method::POST, "/api/onboarding", Some(onboarding("ops@acme.test", true)), None)
        .await;
    let customer_id = body["customerId"].as_str().unwrap().to_string();
    let record = format!("/api/admin/onboarding/{customer_id}");

    let (status, _, _) = app.send(Method::GET, &record, None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = app
        .send(
            Method::PUT,
            &record,
            Some(json!({ "contactName": "Jo", "contactEmail": "Jo@Acme.test" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["companyInfo"]["contactEmail"], "jo@acme.test");

    let (status, body, _) = app.send(Method::DELETE, &record, None, Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _, _) = app.send(Method::GET, "/api/admin/staff", None, Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = app.send(Method::DELETE, &record, None, Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = app.send(Method::GET, "/api/admin/onboarding", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_gate_accepts_stored_role_spellings() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    for spelling in ["Super Admin", "super-admin", "SUPER_ADMIN", "SuperAdmin"] {
        let admin = account::Entity::find()
            .one(&app.state.db)
            .await
            .unwrap()
            .unwrap();
        let mut active = admin.into_active_model();
        active.role = Set(spelling.to_string());
        active.update(&app.state.db).await.unwrap();

        let (status, _, _) = app.send(Method::GET, "/api/admin/staff", None, Some(&token)).await;
        assert_eq!(status, StatusCode::OK, "{spelling}");
    }
}

#[tokio::test]
async fn test_reset_token_single_use() {
    let app = TestApp::new().await;
    app.bootstrap_admin().await;

    let (known_status, known, _) = app
        .send(
            Method::POST,
            "/api/auth/forgot-password",
            Some(json!({ "email": ADMIN_EMAIL })),
            None,
        )
        .await;
    let (unknown_status, unknown, _) = app
        .send(
            Method::POST,
            "/api/auth/forgot-password",
            Some(json!({ "email": "ghost@portal.test" })),
            None,
        )
        .await;
    assert_eq!(known_status, StatusCode::OK);
    assert_eq!(unknown_status, StatusCode::OK);
    assert_eq!(known, unknown);

    // Issuing again replaces the emailed token; use the newest one
    let issued = app
        .state
        .accounts
        .request_password_reset(ADMIN_EMAIL)
        .await
        .unwrap()
        .unwrap();
    let uri = format!("/api/auth/reset-password/{}", issued.token);

    let (status, _, _) = app
        .send(Method::POST, &uri, Some(json!({ "newPassword": "Reset#Pass789" })), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = app
        .send(Method::POST, &uri, Some(json!({ "newPassword": "Again#Pass789" })), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "TOKEN_INVALID");

    let (status, _) = app.login(ADMIN_EMAIL, "Reset#Pass789").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_support_request_survives_tracker_outage() {
    let mut tracker = MockIssueTracker::new();
    tracker
        .expect_create_issue()
        .returning(|_| Err(TrackerError::Status(502, "bad gateway".to_string())));
    tracker.expect_get_issue().never();
    tracker
        .expect_recent_issues()
        .returning(|_| Err(TrackerError::Status(502, "bad gateway".to_string())));
    let app = TestApp::with(Arc::new(LogMailer), Some(Arc::new(tracker))).await;
    let token = app.admin_token().await;

    let (status, body, _) = app
        .send(
            Method::POST,
            "/api/support",
            Some(json!({ "subject": "Need more accounts", "description": "Please add two", "kind": "upgrade" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "Submitted");
    assert!(body.get("trackerKey").is_none());

    let (status, body, _) = app.send(Method::GET, "/api/support", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, body, _) = app
        .send(Method::GET, "/api/admin/dashboard", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["supportRequests"], 1);
    assert_eq!(body["trackerOnline"], false);
}

#[tokio::test]
async fn test_health_reports_database() {
    let app = TestApp::new().await;

    let (status, body, _) = app.send(Method::GET, "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
}

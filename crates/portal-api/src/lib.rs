//! REST API for the onboarding portal

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod validation;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Duration as ChronoDuration;
use portal_auth::{JwtValidator, Role};
use portal_notify::{spawn_delivery, EmailMessage, Mailer};
use portal_tracker::IssueTracker;
use sea_orm::DatabaseConnection;
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;
use handlers::{auth, dashboard, onboarding, staff, support, system};
use services::{AccountService, DashboardService, IntakeService, SupportService};

/// Application state shared across handlers
pub struct AppState {
    pub db: DatabaseConnection,
    pub jwt: JwtValidator,
    pub intake: IntakeService,
    pub accounts: AccountService,
    pub support: SupportService,
    pub dashboard: DashboardService,
    pub mailer: Arc<dyn Mailer>,
    pub notify_timeout: Duration,
    /// Add `Secure` to the session cookie (portal served over https)
    pub secure_cookies: bool,
}

impl AppState {
    /// Hand composed emails to background delivery
    ///
    /// Returns immediately; failures are logged by the delivery task.
    pub fn notify(&self, messages: impl IntoIterator<Item = EmailMessage>) {
        let messages: Vec<EmailMessage> = messages.into_iter().collect();
        if messages.is_empty() {
            return;
        }
        debug!("Queueing {} notification(s)", messages.len());
        drop(spawn_delivery(
            self.mailer.clone(),
            messages,
            self.notify_timeout,
        ));
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Onboarding Portal API",
        version = "0.1.0",
        description = "Customer onboarding, account administration and support requests",
    ),
    paths(
        system::health_check,
        onboarding::submit_onboarding,
        onboarding::lookup_company,
        onboarding::list_submissions,
        onboarding::get_submission,
        onboarding::update_submission,
        onboarding::delete_submission,
        auth::login,
        auth::logout,
        auth::get_current_user,
        auth::forgot_password,
        auth::reset_password,
        auth::change_password,
        staff::list_staff,
        staff::create_staff,
        staff::update_staff,
        staff::delete_staff,
        staff::toggle_staff,
        support::create_support_request,
        support::list_support_requests,
        support::get_support_request,
        dashboard::admin_dashboard,
        dashboard::user_dashboard,
    ),
    components(
        schemas(
            models::ErrorResponse,
            models::MessageResponse,
            models::HealthResponse,
            models::CompanyInfo,
            models::AwsSetup,
            models::Agreements,
            models::OnboardingRequest,
            models::OnboardingCreated,
            models::OnboardingRecord,
            models::OnboardingList,
            models::UpdateContactRequest,
            models::UserView,
            models::LoginRequest,
            models::LoginResponse,
            models::ForgotPasswordRequest,
            models::ResetPasswordRequest,
            models::ChangePasswordRequest,
            models::CreateStaffRequest,
            models::CreateStaffResponse,
            models::UpdateStaffRequest,
            models::StaffList,
            models::CreateSupportRequest,
            models::SupportRequestView,
            models::SupportRequestList,
            models::IssueSummary,
            models::StaffCounts,
            models::AdminDashboard,
            models::UserDashboard,
        )
    ),
    modifiers(&SessionSecurity),
    tags(
        (name = "onboarding", description = "Onboarding wizard and submissions"),
        (name = "auth", description = "Login, logout and password recovery"),
        (name = "staff", description = "Staff account administration"),
        (name = "support", description = "Support and upgrade requests"),
        (name = "dashboard", description = "Dashboards"),
        (name = "system", description = "System health and info endpoints")
    )
)]
struct ApiDoc;

struct SessionSecurity;

impl Modify for SessionSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Enable CORS (for development)
    pub enable_cors: bool,
    /// Allowed CORS origins (if None, allows localhost origins)
    pub cors_origins: Option<Vec<String>>,
    /// Secret used to sign and verify session tokens
    pub jwt_secret: String,
    pub session_ttl: ChronoDuration,
    pub reset_token_ttl: ChronoDuration,
    /// Public base URL of the portal, used in emailed links
    pub portal_url: String,
    /// Internal mailbox that receives a copy of every onboarding
    pub ops_email: String,
    /// Upper bound for a single email delivery
    pub notify_timeout: Duration,
    /// Directory served under `/uploads`
    pub upload_dir: PathBuf,
    /// Built single-page frontend, served for every unmatched path
    pub frontend_dir: Option<PathBuf>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            enable_cors: true,
            cors_origins: None,
            jwt_secret: String::new(),
            session_ttl: ChronoDuration::hours(12),
            reset_token_ttl: ChronoDuration::hours(1),
            portal_url: "http://localhost:3000".to_string(),
            ops_email: "onboarding@localhost".to_string(),
            notify_timeout: Duration::from_secs(10),
            upload_dir: PathBuf::from("uploads"),
            frontend_dir: None,
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(
        config: ApiServerConfig,
        db: DatabaseConnection,
        mailer: Arc<dyn Mailer>,
        tracker: Option<Arc<dyn IssueTracker>>,
    ) -> Self {
        let secret = config.jwt_secret.as_bytes();

        let state = Arc::new(AppState {
            jwt: JwtValidator::new(secret),
            intake: IntakeService::new(db.clone(), config.ops_email.clone()),
            accounts: AccountService::new(
                db.clone(),
                secret,
                config.session_ttl,
                config.reset_token_ttl,
                config.portal_url.clone(),
            ),
            support: SupportService::new(db.clone(), tracker.clone()),
            dashboard: DashboardService::new(db.clone(), tracker),
            db,
            mailer,
            notify_timeout: config.notify_timeout,
            secure_cookies: config.portal_url.starts_with("https://"),
        });

        Self { config, state }
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let api_doc = ApiDoc::openapi();

        // PUBLIC routes
        let public_router = Router::new()
            .route("/api/health", get(system::health_check))
            .route("/api/onboarding", post(onboarding::submit_onboarding))
            .route("/api/onboarding/company", get(onboarding::lookup_company))
            .route("/api/auth/login", post(auth::login))
            .route("/api/auth/logout", post(auth::logout))
            .route("/api/auth/forgot-password", post(auth::forgot_password))
            .route(
                "/api/auth/reset-password/{token}",
                post(auth::reset_password),
            );

        // Reachable while the account must still change its password
        let session_router = Router::new()
            .route("/api/auth/me", get(auth::get_current_user))
            .route("/api/admin/change-password", post(auth::change_password));

        let member_router = Router::new()
            .route(
                "/api/support",
                get(support::list_support_requests).post(support::create_support_request),
            )
            .route("/api/support/{id}", get(support::get_support_request))
            .route("/api/dashboard", get(dashboard::user_dashboard));

        let staff_router = Router::new()
            .route("/api/admin/onboarding", get(onboarding::list_submissions))
            .route(
                "/api/admin/onboarding/{customer_id}",
                get(onboarding::get_submission).put(onboarding::update_submission),
            )
            .layer(axum_middleware::from_fn_with_state(
                Role::Staff,
                middleware::require_role,
            ));

        let admin_router = Router::new()
            .route(
                "/api/admin/onboarding/{customer_id}",
                delete(onboarding::delete_submission),
            )
            .route(
                "/api/admin/staff",
                get(staff::list_staff).post(staff::create_staff),
            )
            .route(
                "/api/admin/staff/{id}",
                put(staff::update_staff).delete(staff::delete_staff),
            )
            .route("/api/admin/staff/{id}/toggle", put(staff::toggle_staff))
            .route("/api/admin/dashboard", get(dashboard::admin_dashboard))
            .layer(axum_middleware::from_fn_with_state(
                Role::Admin,
                middleware::require_role,
            ));

        let gated_router = member_router
            .merge(staff_router)
            .merge(admin_router)
            .layer(axum_middleware::from_fn(middleware::require_password_current));

        let protected_router = session_router.merge(gated_router).layer(
            axum_middleware::from_fn_with_state(self.state.clone(), middleware::require_auth),
        );

        let api_router = public_router
            .merge(protected_router)
            .with_state(self.state.clone());

        // SwaggerUi serves /api/openapi.json alongside the UI
        let mut router = Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", api_doc))
            .merge(api_router)
            .nest_service("/uploads", ServeDir::new(&self.config.upload_dir));

        if let Some(dir) = &self.config.frontend_dir {
            // Unknown paths get index.html so client-side routing works
            router = router.fallback_service(
                ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
            );
        }

        let mut router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            router = router.layer(self.cors_layer());
        }

        router
    }

    fn cors_layer(&self) -> CorsLayer {
        // Cookies need credentials, which rules out a wildcard origin
        let origin = match &self.config.cors_origins {
            Some(origins) => AllowOrigin::list(origins.iter().filter_map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|e| warn!("Ignoring invalid CORS origin {}: {}", origin, e))
                    .ok()
            })),
            None => AllowOrigin::predicate(|origin: &HeaderValue, _| {
                let origin = origin.to_str().unwrap_or("");
                origin.starts_with("http://localhost:")
                    || origin.starts_with("http://127.0.0.1:")
                    || origin.starts_with("https://localhost:")
                    || origin.starts_with("https://127.0.0.1:")
            }),
        };

        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true)
            .allow_origin(origin)
    }

    /// Serve until `shutdown` resolves
    pub async fn start(
        self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/api/openapi.json",
            self.config.bind_addr
        );
        info!("Swagger UI: http://{}/swagger-ui", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}

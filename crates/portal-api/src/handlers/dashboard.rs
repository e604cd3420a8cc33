use std::sync::Arc;

use axum::{extract::State, Extension, Json};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::*;
use crate::AppState;

/// Portal-wide counts and recent tracker activity
#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses(
        (status = 200, description = "Admin dashboard", body = AdminDashboard),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("session" = [])),
    tag = "dashboard"
)]
pub async fn admin_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AdminDashboard>, ApiError> {
    Ok(Json(state.dashboard.admin_summary().await?))
}

/// The caller's own requests and their tracker status
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "User dashboard", body = UserDashboard),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Password change required", body = ErrorResponse)
    ),
    security(("session" = [])),
    tag = "dashboard"
)]
pub async fn user_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserDashboard>, ApiError> {
    Ok(Json(state.dashboard.user_summary(&user).await?))
}

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use super::{ApiJson, ApiPath};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::*;
use crate::AppState;

/// List staff and administrator accounts
#[utoipa::path(
    get,
    path = "/api/admin/staff",
    responses(
        (status = 200, description = "Staff accounts", body = StaffList),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("session" = [])),
    tag = "staff"
)]
pub async fn list_staff(State(state): State<Arc<AppState>>) -> Result<Json<StaffList>, ApiError> {
    let staff: Vec<UserView> = state
        .accounts
        .list_staff()
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let total = staff.len();

    Ok(Json(StaffList { staff, total }))
}

/// Create an account that must change its password on first login
#[utoipa::path(
    post,
    path = "/api/admin/staff",
    request_body = CreateStaffRequest,
    responses(
        (status = 201, description = "Account created", body = CreateStaffResponse),
        (status = 400, description = "Invalid input or duplicate email", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("session" = [])),
    tag = "staff"
)]
pub async fn create_staff(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreateStaffRequest>,
) -> Result<(StatusCode, Json<CreateStaffResponse>), ApiError> {
    let created = state.accounts.create_staff(&user, req).await?;
    state.notify(created.notification);

    Ok((
        StatusCode::CREATED,
        Json(CreateStaffResponse {
            staff: created.account.into(),
            temporary_password: created.temporary_password,
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/admin/staff/{id}",
    params(
        ("id" = Uuid, Path, description = "Account ID")
    ),
    request_body = UpdateStaffRequest,
    responses(
        (status = 200, description = "Account updated", body = UserView),
        (status = 400, description = "Invalid input or duplicate email", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    security(("session" = [])),
    tag = "staff"
)]
pub async fn update_staff(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateStaffRequest>,
) -> Result<Json<UserView>, ApiError> {
    let updated = state.accounts.update_staff(&user, id, req).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/admin/staff/{id}",
    params(
        ("id" = Uuid, Path, description = "Account ID")
    ),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 400, description = "Cannot delete your own account", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    security(("session" = [])),
    tag = "staff"
)]
pub async fn delete_staff(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.accounts.delete_staff(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Activate or deactivate an account
#[utoipa::path(
    put,
    path = "/api/admin/staff/{id}/toggle",
    params(
        ("id" = Uuid, Path, description = "Account ID")
    ),
    responses(
        (status = 200, description = "Account with its new active flag", body = UserView),
        (status = 400, description = "Cannot deactivate your own account", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    security(("session" = [])),
    tag = "staff"
)]
pub async fn toggle_staff(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<UserView>, ApiError> {
    let updated = state.accounts.toggle_staff(&user, id).await?;
    Ok(Json(updated.into()))
}

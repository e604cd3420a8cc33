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

/// File a support or upgrade request
#[utoipa::path(
    post,
    path = "/api/support",
    request_body = CreateSupportRequest,
    responses(
        (status = 201, description = "Request recorded", body = SupportRequestView),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("session" = [])),
    tag = "support"
)]
pub async fn create_support_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreateSupportRequest>,
) -> Result<(StatusCode, Json<SupportRequestView>), ApiError> {
    let reporter = state.accounts.get(user.account_id).await?;
    let created = state.support.create(&reporter, req).await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Own requests; staff see every request
#[utoipa::path(
    get,
    path = "/api/support",
    responses(
        (status = 200, description = "Support requests", body = SupportRequestList),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("session" = [])),
    tag = "support"
)]
pub async fn list_support_requests(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SupportRequestList>, ApiError> {
    let requests: Vec<SupportRequestView> = state
        .support
        .list(&user)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let total = requests.len();

    Ok(Json(SupportRequestList { requests, total }))
}

#[utoipa::path(
    get,
    path = "/api/support/{id}",
    params(
        ("id" = Uuid, Path, description = "Support request ID")
    ),
    responses(
        (status = 200, description = "Support request", body = SupportRequestView),
        (status = 404, description = "Support request not found", body = ErrorResponse)
    ),
    security(("session" = [])),
    tag = "support"
)]
pub async fn get_support_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SupportRequestView>, ApiError> {
    let request = state.support.get(&user, id).await?;
    Ok(Json(request.into()))
}

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use tracing::{debug, info};

use super::{ApiJson, ApiPath, ApiQuery};
use crate::error::ApiError;
use crate::models::*;
use crate::AppState;

/// Submit the onboarding wizard
///
/// Confirmation emails are sent in the background; a delivery failure never
/// changes the response.
#[utoipa::path(
    post,
    path = "/api/onboarding",
    request_body = OnboardingRequest,
    responses(
        (status = 201, description = "Submission accepted", body = OnboardingCreated),
        (status = 400, description = "Missing fields, invalid values or duplicate company email", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "onboarding"
)]
pub async fn submit_onboarding(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<OnboardingRequest>,
) -> Result<(StatusCode, Json<OnboardingCreated>), ApiError> {
    let outcome = state.intake.submit(payload).await?;
    let customer_id = outcome.submission.customer_id.clone();

    info!(
        "Onboarding accepted for {} as {}",
        outcome.submission.company_email, customer_id
    );
    state.notify(outcome.notifications);

    Ok((
        StatusCode::CREATED,
        Json(OnboardingCreated {
            message: "Onboarding submitted successfully".to_string(),
            customer_id,
        }),
    ))
}

/// Look up a submission by company email
#[utoipa::path(
    get,
    path = "/api/onboarding/company",
    params(CompanyLookupQuery),
    responses(
        (status = 200, description = "Submission found", body = OnboardingRecord),
        (status = 404, description = "No submission for that email", body = ErrorResponse)
    ),
    tag = "onboarding"
)]
pub async fn lookup_company(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<CompanyLookupQuery>,
) -> Result<Json<OnboardingRecord>, ApiError> {
    debug!("Company lookup");

    let submission = state.intake.find_by_company_email(&query.email).await?;
    Ok(Json(submission.into()))
}

/// List submissions, newest first
#[utoipa::path(
    get,
    path = "/api/admin/onboarding",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of submissions", body = OnboardingList),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Staff role required", body = ErrorResponse)
    ),
    security(("session" = [])),
    tag = "onboarding"
)]
pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<OnboardingList>, ApiError> {
    let (submissions, total, page, per_page) =
        state.intake.list(query.page, query.per_page).await?;

    Ok(Json(OnboardingList {
        submissions: submissions.into_iter().map(Into::into).collect(),
        total,
        page,
        per_page,
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/onboarding/{customer_id}",
    params(
        ("customer_id" = String, Path, description = "Customer ID (CS-XXXXXXXX)")
    ),
    responses(
        (status = 200, description = "Submission", body = OnboardingRecord),
        (status = 404, description = "Submission not found", body = ErrorResponse)
    ),
    security(("session" = [])),
    tag = "onboarding"
)]
pub async fn get_submission(
    State(state): State<Arc<AppState>>,
    ApiPath(customer_id): ApiPath<String>,
) -> Result<Json<OnboardingRecord>, ApiError> {
    let submission = state.intake.get(&customer_id).await?;
    Ok(Json(submission.into()))
}

/// Update the primary contact of a submission
#[utoipa::path(
    put,
    path = "/api/admin/onboarding/{customer_id}",
    params(
        ("customer_id" = String, Path, description = "Customer ID (CS-XXXXXXXX)")
    ),
    request_body = UpdateContactRequest,
    responses(
        (status = 200, description = "Updated submission", body = OnboardingRecord),
        (status = 400, description = "Invalid contact email", body = ErrorResponse),
        (status = 404, description = "Submission not found", body = ErrorResponse)
    ),
    security(("session" = [])),
    tag = "onboarding"
)]
pub async fn update_submission(
    State(state): State<Arc<AppState>>,
    ApiPath(customer_id): ApiPath<String>,
    ApiJson(update): ApiJson<UpdateContactRequest>,
) -> Result<Json<OnboardingRecord>, ApiError> {
    let updated = state.intake.update_contact(&customer_id, update).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/admin/onboarding/{customer_id}",
    params(
        ("customer_id" = String, Path, description = "Customer ID (CS-XXXXXXXX)")
    ),
    responses(
        (status = 204, description = "Submission deleted"),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Submission not found", body = ErrorResponse)
    ),
    security(("session" = [])),
    tag = "onboarding"
)]
pub async fn delete_submission(
    State(state): State<Arc<AppState>>,
    ApiPath(customer_id): ApiPath<String>,
) -> Result<StatusCode, ApiError> {
    state.intake.delete(&customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

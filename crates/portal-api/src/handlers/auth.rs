use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue},
    Extension, Json,
};
use tracing::{debug, info};

use super::{ApiJson, ApiPath};
use crate::error::ApiError;
use crate::middleware::{AuthUser, SESSION_COOKIE};
use crate::models::*;
use crate::AppState;

const RESET_REQUESTED: &str =
    "If an account exists for that email, a password reset link has been sent";

fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> Result<HeaderValue, ApiError> {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::Internal(format!("Invalid session cookie: {}", e)))
}

/// Log in with email and password
///
/// The session token is returned in the body and set as an HTTP-only cookie.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Account inactive", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<([(header::HeaderName, HeaderValue); 1], Json<LoginResponse>), ApiError> {
    let session = state.accounts.login(&req.email, &req.password).await?;

    let max_age = (session.expires_at - chrono::Utc::now()).num_seconds().max(0);
    let cookie = session_cookie(&session.token, max_age, state.secure_cookies)?;
    let must_change_password = session.account.must_change_password;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            token: session.token,
            expires_at: session.expires_at,
            user: session.account.into(),
            must_change_password,
        }),
    ))
}

/// Clear the session cookie
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
) -> Result<([(header::HeaderName, HeaderValue); 1], Json<MessageResponse>), ApiError> {
    let cookie = session_cookie("", 0, state.secure_cookies)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse::new("Logged out")),
    ))
}

/// Current account
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Authenticated account", body = UserView),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("session" = [])),
    tag = "auth"
)]
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserView>, ApiError> {
    let account = state.accounts.get(user.account_id).await?;
    Ok(Json(account.into()))
}

/// Request a password reset email
///
/// Responds identically whether or not the email belongs to an account.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Request accepted", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    match state.accounts.request_password_reset(&req.email).await? {
        Some(issued) => {
            debug!("Queued reset email for {}", issued.email);
            state.notify(issued.notification);
        }
        None => debug!("No reset issued"),
    }

    Ok(Json(MessageResponse::new(RESET_REQUESTED)))
}

/// Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/api/auth/reset-password/{token}",
    params(
        ("token" = String, Path, description = "Reset token from the email link")
    ),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid or expired token, or weak password", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ApiPath(token): ApiPath<String>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let notification = state
        .accounts
        .reset_password(&token, &req.new_password)
        .await?;
    state.notify(notification);

    Ok(Json(MessageResponse::new("Password has been reset")))
}

/// Change the password of the current account
///
/// Reachable while the account is still flagged to change its password.
#[utoipa::path(
    post,
    path = "/api/admin/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "New password rejected", body = ErrorResponse),
        (status = 401, description = "Current password is incorrect", body = ErrorResponse)
    ),
    security(("session" = [])),
    tag = "auth"
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (account, notification) = state
        .accounts
        .change_password(user.account_id, &req.old_password, &req.new_password)
        .await?;
    state.notify(notification);

    info!("Password changed for {}", account.email);
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

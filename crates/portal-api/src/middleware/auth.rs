//! Session authentication and role authorization middleware
//!
//! Per request: no token -> 401, bad token -> 401, inactive account -> 403,
//! insufficient role -> 403, otherwise the handler runs with an [`AuthUser`]
//! in the request extensions. None of these layers write to the database.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
    Extension,
};
use portal_auth::{Role, SESSION_TOKEN_TYPE};
use portal_db::entities::account;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{error::ApiError, AppState};

/// Name of the HTTP-only cookie carrying the session token
pub const SESSION_COOKIE: &str = "session_token";

/// Authenticated account context, resolved from the database on every request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub account_id: Uuid,
    pub email: String,
    pub role: Role,
    pub must_change_password: bool,
}

fn extract_token(headers: &HeaderMap) -> Result<String, ApiError> {
    // Cookie first (browser sessions), then Authorization header (API clients)
    let from_cookie = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .map(str::trim)
                .find_map(|c| c.strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
                .filter(|token| !token.is_empty())
                .map(str::to_string)
        });

    if let Some(token) = from_cookie {
        return Ok(token);
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            ApiError::unauthorized("Missing authentication token (cookie or Authorization header)")
        })?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ApiError::unauthorized(
                "Invalid Authorization header format. Expected 'Bearer <token>'",
            )
        })
}

/// Validates the session token and loads the account behind it
///
/// The role and the first-login flag come from the stored account, not from
/// the token claims, so role changes and deactivation take effect at once.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())?;

    let claims = state
        .jwt
        .validate(&token)
        .map_err(|e| ApiError::unauthorized(format!("Invalid or expired token: {}", e)))?;

    if claims.token_type.as_deref() != Some(SESSION_TOKEN_TYPE) {
        return Err(ApiError::unauthorized(
            "Invalid token type. Expected 'session' token",
        ));
    }

    let account_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::unauthorized("Token subject is not a valid account id"))?;

    let account = account::Entity::find_by_id(account_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    if !account.is_active {
        debug!("Rejected session for inactive account {}", account.id);
        return Err(ApiError::AccountInactive);
    }

    let role = Role::parse(&account.role).map_err(|e| {
        warn!("Account {} has an unrecognized role: {}", account.id, e);
        ApiError::forbidden("Account role is not recognized")
    })?;

    request.extensions_mut().insert(AuthUser {
        account_id: account.id,
        email: account.email,
        role,
        must_change_password: account.must_change_password,
    });

    Ok(next.run(request).await)
}

/// Blocks accounts that still have to replace an admin-issued password
pub async fn require_password_current(
    Extension(user): Extension<AuthUser>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if user.must_change_password {
        return Err(ApiError::PasswordChangeRequired);
    }

    Ok(next.run(request).await)
}

/// Role gate; use with `from_fn_with_state(Role::Admin, require_role)`
pub async fn require_role(
    State(required): State<Role>,
    Extension(user): Extension<AuthUser>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !user.role.satisfies(required) {
        debug!(
            "Account {} with role {} denied; {} required",
            user.account_id, user.role, required
        );
        return Err(ApiError::forbidden(format!(
            "This action requires the {} role",
            required
        )));
    }

    Ok(next.run(request).await)
}

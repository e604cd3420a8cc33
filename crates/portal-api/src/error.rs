//! API error taxonomy
//!
//! Every failure a handler or middleware can produce maps onto one
//! [`ApiError`] variant, and every variant renders as an [`ErrorResponse`]
//! JSON body. Storage and internal failures are logged here and reach the
//! client only as a generic message.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use portal_auth::{PasswordError, PasswordPolicyError};
use sea_orm::DbErr;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

const GENERIC_ERROR: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingRequiredFields(Vec<String>),

    #[error("{field} '{value}' is already registered")]
    DuplicateEntry { field: String, value: String },

    #[error("Reset token is invalid or has expired")]
    TokenInvalid,

    #[error("{0}")]
    Authentication(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Password change required before continuing")]
    PasswordChangeRequired,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    Persistence(#[from] DbErr),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        ApiError::DuplicateEntry {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Authentication(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    /// A password-setting request whose new password breaks the policy
    pub fn weak_password(field: &str, err: PasswordPolicyError) -> Self {
        ApiError::validation(field, err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. }
            | ApiError::MissingRequiredFields(_)
            | ApiError::DuplicateEntry { .. }
            | ApiError::TokenInvalid => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_)
            | ApiError::AccountInactive
            | ApiError::PasswordChangeRequired => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Persistence(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::MissingRequiredFields(_) => "MISSING_REQUIRED_FIELDS",
            ApiError::DuplicateEntry { .. } => "DUPLICATE_ENTRY",
            ApiError::TokenInvalid => "TOKEN_INVALID",
            ApiError::Authentication(_) => "UNAUTHORIZED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::AccountInactive => "ACCOUNT_INACTIVE",
            ApiError::PasswordChangeRequired => "PASSWORD_CHANGE_REQUIRED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Persistence(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn to_response_body(&self) -> ErrorResponse {
        let (error, field, value) = match self {
            ApiError::Persistence(_) | ApiError::Internal(_) => {
                (GENERIC_ERROR.to_string(), None, None)
            }
            ApiError::Validation { field, .. } => (self.to_string(), Some(field.clone()), None),
            ApiError::DuplicateEntry { field, value } => (
                self.to_string(),
                Some(field.clone()),
                Some(value.clone()),
            ),
            _ => (self.to_string(), None, None),
        };

        ErrorResponse {
            error,
            code: Some(self.code().to_string()),
            field,
            value,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Persistence(e) => error!("PersistenceFailure: {}", e),
            ApiError::Internal(msg) => error!("Internal error: {}", msg),
            _ => {}
        }

        (self.status(), Json(self.to_response_body())).into_response()
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation("body", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation("query", rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation("path", rejection.body_text())
    }
}

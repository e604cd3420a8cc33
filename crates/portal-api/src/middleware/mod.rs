//! API Middleware
//!
//! Middleware layers for authentication, authorization, and request processing.

pub mod auth;

pub use auth::{require_auth, require_password_current, require_role, AuthUser, SESSION_COOKIE};

//! HTTP handlers, grouped by resource
//!
//! Handlers stay thin: extract, call a service, shape the response, hand any
//! composed emails to background delivery.

pub mod auth;
pub mod dashboard;
pub mod onboarding;
pub mod staff;
pub mod support;
pub mod system;

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// JSON body extractor whose rejections render as [`ApiError`]
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

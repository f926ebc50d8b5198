//! API Routes
//!
//! Route handlers organized by functionality.

pub mod crawls;
pub mod health;
pub mod query;

use axum::{extract::rejection::QueryRejection, extract::Query};

use crate::api::error::{ApiError, ApiResult};

/// Unwrap query-string parameters, turning a rejection into the envelope
pub(crate) fn params<T>(extracted: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    extracted
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::Validation(rejection.body_text()))
}

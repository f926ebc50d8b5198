//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses carrying the JSON error envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::error::Error as _;
use thiserror::Error;

use crate::api::dto::ErrorResponse;
use crate::api::response::json_response;
use crate::query::QueryError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("{0}")]
    Validation(String),

    /// Resource not found
    #[error("{0}")]
    NotFound(String),

    /// Query planning failed
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Too many queries running and waiting
    #[error("Server overloaded: {0}")]
    Overloaded(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Query(QueryError::UnknownCrawl(_)) => StatusCode::NOT_FOUND,
            ApiError::Query(_) => StatusCode::BAD_REQUEST,
            ApiError::Overloaded(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Source chain of a server-side fault
    fn traceback(&self) -> Option<String> {
        if !self.status().is_server_error() {
            return None;
        }

        let mut chain = vec![format!("{:?}", self)];
        let mut source = self.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        Some(chain.join("\ncaused by: "))
    }
}

/// Envelope for `status` with `message`
pub fn envelope(status: StatusCode, message: String, traceback: Option<String>) -> ErrorResponse {
    ErrorResponse {
        message,
        status: status.to_string(),
        traceback,
        version: crate::version_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                status = %status,
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                status = %status,
                error_message = %self,
                "Request rejected"
            );
        }

        let body = envelope(status, self.to_string(), self.traceback());
        json_response(status, &body, true)
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

//! Error types for tripweave-planner
//!
//! Every failure a handler can return maps to one status class and a
//! `{"error": {"code", "message"}}` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::pipeline::RecoveryError;
use crate::services::{UpstreamError, UpstreamKind};
use crate::validation::ValidationError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid trip request (400)
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Missing or rejected credentials (500)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Collaborator quota exhausted (429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Collaborator unreachable or timed out (503)
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// Model output could not be turned into a plan (502)
    #[error("Unparseable model output: {0}")]
    Unparseable(String),
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        let message = err.to_string();
        match err.kind {
            UpstreamKind::Quota => ApiError::RateLimited(message),
            UpstreamKind::Configuration => ApiError::Configuration(message),
            UpstreamKind::Network => ApiError::Upstream(message),
        }
    }
}

impl From<RecoveryError> for ApiError {
    fn from(err: RecoveryError) -> Self {
        // Raw text goes to the log only, never the response body
        if let RecoveryError::Unparseable { original, cleaned } = &err {
            warn!(
                original_len = original.len(),
                cleaned = %preview(cleaned),
                "Model output unrecoverable"
            );
        }
        ApiError::Unparseable(err.to_string())
    }
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 200;
    match text.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Unparseable(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Configuration(_) => "CONFIGURATION_ERROR",
            ApiError::RateLimited(_) => "RATE_LIMITED",
            ApiError::Upstream(_) => "UPSTREAM_UNAVAILABLE",
            ApiError::Unparseable(_) => "UNPARSEABLE_OUTPUT",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut error = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let ApiError::Validation(ref err) = self {
            error["problems"] = json!(err.problems);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

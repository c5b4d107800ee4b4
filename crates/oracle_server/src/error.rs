//! HTTP error mapping
//!
//! Every failed request answers with `{"error": <code>, "message": <text>}`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use oracle_pipeline::PipelineError;
use serde::{Deserialize, Serialize};

/// Error body returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Error returned by request handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Malformed body or path
    #[error("{0}")]
    BadRequest(String),

    #[error("report {0} not found")]
    ReportNotFound(uuid::Uuid),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    /// Status code and machine-readable error code
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::ReportNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Pipeline(err) => match err {
                PipelineError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed"),
                PipelineError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                PipelineError::AlreadyStarted(_) => (StatusCode::CONFLICT, "already_started"),
                PipelineError::NotRunning(_) => (StatusCode::CONFLICT, "not_running"),
                PipelineError::NotReady { .. } => (StatusCode::CONFLICT, "not_ready"),
                PipelineError::Store(_) | PipelineError::Render(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ErrorResponse {
            error: code.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

//! HTTP error envelope shared by every route.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::services::generate::GenerateError;
use crate::services::jobs::JobError;
use crate::services::registry::ProviderError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("Invalid job id: {0}")]
    InvalidJobId(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Content generation failed: {0}")]
    Generation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("validation_error")),
            ApiError::InvalidJson(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("invalid_json")),
            ApiError::InvalidJobId(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("invalid_job_id")),
            ApiError::Provider(e) => match e.root() {
                ProviderError::Unsupported { .. } => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("unsupported_provider")),
                ProviderError::MissingCredential { .. } => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("missing_credential")),
                ProviderError::Construction { .. } => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("provider_construction")),
            },
            ApiError::JobNotFound(_) => (StatusCode::NOT_FOUND, "not_found_error", Some("job_not_found")),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "invalid_request_error", Some("duplicate_job")),
            ApiError::Generation(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", Some("generation_failed")),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: error_type.to_string(),
                code: code.map(|c| c.to_string()),
            },
        });

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidJson(rejection.body_text())
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Validation(report) => ApiError::Validation(report.to_string()),
            JobError::Provider(e) => ApiError::Provider(e),
            JobError::NotFound(id) => ApiError::JobNotFound(id),
            e @ JobError::AlreadyEnqueued(_) => ApiError::Conflict(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<GenerateError> for ApiError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::Validation(report) => ApiError::Validation(report.to_string()),
            GenerateError::Provider(e) => ApiError::Provider(e),
            GenerateError::Generation(e) => ApiError::Generation(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

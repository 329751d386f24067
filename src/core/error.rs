use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

use crate::shared::types::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    /// Transient store failure; the caller may retry the whole operation.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(sqlx::Error),

    /// Oracle error, timeout, or schema-non-conforming response. Not retried
    /// automatically; the submitter resubmits.
    #[error("Classification failed: {0}")]
    ClassificationFailed(String),

    #[error("Report {0} not found")]
    ReportNotFound(Uuid),

    #[error("Invalid status transition: {0}")]
    InvalidStatus(String),

    #[error("Missing resolution evidence: {0}")]
    MissingResolutionEvidence(String),

    /// Lost-update risk detected by the store; the caller retries the whole
    /// operation from scratch, not just the write.
    #[error("Concurrent update conflict: {0}")]
    ConcurrentUpdateConflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Classify a sqlx error at the store boundary. Serialization and
    /// deadlock failures surface as `ConcurrentUpdateConflict` so callers
    /// know to retry the whole operation; everything else is transient
    /// unavailability.
    pub fn store(e: sqlx::Error) -> Self {
        if let Some(code) = e.as_database_error().and_then(|d| d.code()) {
            if code == "40001" || code == "40P01" {
                tracing::warn!("Store reported update conflict: {:?}", e);
                return AppError::ConcurrentUpdateConflict(
                    "store detected a conflicting concurrent update; retry the operation"
                        .to_string(),
                );
            }
        }
        tracing::error!("Store error: {:?}", e);
        AppError::StoreUnavailable(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::StoreUnavailable(ref e) => {
                tracing::error!("Store unavailable: {:?}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Store unavailable, retry later".to_string(),
                    None,
                )
            }
            AppError::ClassificationFailed(ref msg) => {
                tracing::error!("Classification failed: {}", msg);
                (StatusCode::BAD_GATEWAY, self.to_string(), None)
            }
            AppError::ReportNotFound(_) => (StatusCode::NOT_FOUND, self.to_string(), None),
            AppError::InvalidStatus(_) => (StatusCode::BAD_REQUEST, self.to_string(), None),
            AppError::MissingResolutionEvidence(_) => {
                (StatusCode::BAD_REQUEST, self.to_string(), None)
            }
            AppError::ConcurrentUpdateConflict(_) => {
                (StatusCode::CONFLICT, self.to_string(), None)
            }
            AppError::Validation(ref msg) => (
                StatusCode::BAD_REQUEST,
                msg.clone(),
                Some(vec![msg.clone()]),
            ),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::Auth(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            AppError::Unauthorized(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            AppError::Forbidden(ref msg) => (StatusCode::FORBIDDEN, msg.clone(), None),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = Json(ApiResponse::<()>::error(Some(message), errors));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::llm_client::LlmError;
use crate::matching::embedder::EmbeddingError;
use crate::matching::indexer::IndexError;
use crate::matching::scoring::ScoringError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    DocumentLoad(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Empty or invalid resume content")]
    EmptyResumeContent,

    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    #[error("Upstream rate limited: {0}")]
    UpstreamRateLimited(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Timeout { .. } => AppError::UpstreamTimeout(e.to_string()),
            LlmError::RateLimited { .. } => AppError::UpstreamRateLimited(e.to_string()),
            other => AppError::Llm(other.to_string()),
        }
    }
}

impl From<ExtractionError> for AppError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::UnsupportedFormat(_) => AppError::UnsupportedFormat(e.to_string()),
            ExtractionError::DocumentLoadFailure(_) => AppError::DocumentLoad(e.to_string()),
            ExtractionError::NoJsonFound { .. }
            | ExtractionError::MalformedJson { .. }
            | ExtractionError::IncompleteExtraction { .. } => {
                AppError::ExtractionFailed(e.to_string())
            }
            ExtractionError::EmptyResumeContent => AppError::EmptyResumeContent,
            ExtractionError::UpstreamTimeout { .. } => AppError::UpstreamTimeout(e.to_string()),
            ExtractionError::UpstreamRateLimited { .. } => {
                AppError::UpstreamRateLimited(e.to_string())
            }
            ExtractionError::Llm(inner) => inner.into(),
        }
    }
}

impl From<IndexError> for AppError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::EmptyContent => AppError::EmptyResumeContent,
            IndexError::Embedding(EmbeddingError::Timeout { .. }) => {
                AppError::UpstreamTimeout(e.to_string())
            }
            IndexError::Embedding(EmbeddingError::RateLimited { .. }) => {
                AppError::UpstreamRateLimited(e.to_string())
            }
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<ScoringError> for AppError {
    fn from(e: ScoringError) -> Self {
        match e {
            ScoringError::EmptyResumeContent => AppError::EmptyResumeContent,
            ScoringError::Llm(inner) => inner.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied".to_string(),
            ),
            AppError::UnsupportedFormat(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_FORMAT",
                msg.clone(),
            ),
            AppError::DocumentLoad(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "DOCUMENT_LOAD_FAILURE",
                msg.clone(),
            ),
            AppError::ExtractionFailed(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EXTRACTION_FAILED",
                msg.clone(),
            ),
            AppError::EmptyResumeContent => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EMPTY_RESUME_CONTENT",
                self.to_string(),
            ),
            AppError::UpstreamTimeout(msg) => {
                tracing::warn!("Upstream timeout: {msg}");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "UPSTREAM_TIMEOUT",
                    msg.clone(),
                )
            }
            AppError::UpstreamRateLimited(msg) => {
                tracing::warn!("Upstream rate limited: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "UPSTREAM_RATE_LIMITED",
                    "The AI provider is rate limiting requests; try again shortly".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#![allow(dead_code)]

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid task transition: {0}")]
    InvalidTransition(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage conflict: {0}")]
    Conflict(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Structured output parse error: {0}")]
    Parse(String),

    #[error("Request cancelled or deadline exceeded")]
    Cancelled,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<crate::llm_client::LlmError> for AppError {
    fn from(e: crate::llm_client::LlmError) -> Self {
        use crate::llm_client::LlmError;
        match e {
            LlmError::Deadline(_) => AppError::Cancelled,
            LlmError::Parse(err) => AppError::Parse(err.to_string()),
            other => AppError::Llm(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone()),
            AppError::InvalidTransition(msg) => {
                (StatusCode::CONFLICT, "INVALID_TRANSITION", msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Conflict(msg) => {
                tracing::error!("Storage conflict: {msg}");
                (
                    StatusCode::CONFLICT,
                    "STORAGE_CONFLICT",
                    "The operation conflicted with a concurrent write".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "LLM_UNAVAILABLE",
                    "The language model provider is unavailable".to_string(),
                )
            }
            AppError::Parse(msg) => {
                tracing::error!("Parse error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "PARSE_FAILURE",
                    "Structured model output could not be parsed".to_string(),
                )
            }
            AppError::Cancelled => (
                StatusCode::REQUEST_TIMEOUT,
                "CANCELLED",
                "The request was cancelled or its deadline elapsed".to_string(),
            ),
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

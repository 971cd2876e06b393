//! Server-wide error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for server operations
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unsupported file format '{extension}'. Supported extensions: {supported}")]
    UnsupportedFormat { extension: String, supported: String },

    #[error("Uploaded file is empty")]
    EmptyInput,

    #[error("Schema detection failed: {0}")]
    SchemaDetection(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Rowhouse error: {0}")]
    Common(#[from] rowhouse_common::CommonError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{resource} '{id}' not found"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::UnsupportedFormat { .. } | AppError::EmptyInput => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Validation(ref message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::NotFound(ref message) => (StatusCode::NOT_FOUND, message.clone()),
            AppError::SchemaDetection(ref message) => {
                (StatusCode::UNPROCESSABLE_ENTITY, message.clone())
            }
            AppError::Database(ref e) => {
                tracing::error!(error = ?e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            AppError::Persistence(ref message) => {
                tracing::error!(error = %message, "Persistence error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A persistence error occurred".to_string(),
                )
            }
            AppError::Common(ref e) => {
                tracing::error!(error = ?e, "Common error");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::Internal(ref message) => {
                tracing::error!(error = %message, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<crate::repo::RepoError> for AppError {
    fn from(err: crate::repo::RepoError) -> Self {
        match err {
            crate::repo::RepoError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::Persistence(other.to_string()),
        }
    }
}

impl From<crate::parser::ParserError> for AppError {
    fn from(err: crate::parser::ParserError) -> Self {
        match err {
            crate::parser::ParserError::UnsupportedFormat {
                extension,
                supported,
            } => AppError::UnsupportedFormat {
                extension,
                supported,
            },
            crate::parser::ParserError::EmptyInput => AppError::EmptyInput,
            other => AppError::SchemaDetection(other.to_string()),
        }
    }
}

use crate::storage::{MovieRepository, StorageError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub movies: Arc<dyn MovieRepository>,
}

impl AppState {
    pub fn new(movies: Arc<dyn MovieRepository>) -> Self {
        Self { movies }
    }
}

/// Response after deleting a movie
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub count: u64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("movie not found")]
    NotFound,

    #[error("insert failed")]
    InsertFailed(String),

    #[error("store unavailable")]
    Unavailable(String),

    #[error("internal error")]
    Internal(String),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => AppError::NotFound,
            StorageError::Insert(msg) => AppError::InsertFailed(msg),
            e @ StorageError::Timeout {
                operation: "insert_one",
            } => AppError::InsertFailed(e.to_string()),
            e @ (StorageError::Timeout { .. } | StorageError::Connect(_)) => {
                AppError::Unavailable(e.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InsertFailed(detail) | AppError::Internal(detail) => {
                error!(detail = %detail, "{}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Unavailable(detail) => {
                warn!(detail = %detail, "{}", self);
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

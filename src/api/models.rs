use crate::lookup::BookLookup;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub lookup: Arc<BookLookup>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
    pub table: String,
    pub variant: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Errors raised by the HTTP layer itself, before the lookup handler runs.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => {
                warn!("Rejected request: {}", msg);
                (StatusCode::BAD_REQUEST, msg)
            }
        };

        (status, Json(ErrorResponse {
            error: status.to_string(),
            message,
        }))
        .into_response()
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::registry::RegistryError;

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
    request_id: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

/// Failure categories surfaced to API callers.
#[derive(Debug)]
pub enum ApiError {
    InvalidArgument(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            ApiError::InvalidArgument(m) => (StatusCode::BAD_REQUEST, "invalid_argument", m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", m),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        if e.is_invalid_argument() {
            return ApiError::InvalidArgument(e.to_string());
        }
        match e {
            RegistryError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, error = message, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.to_string(),
                request_id: format!("req_{}", Uuid::new_v4()),
            },
        };
        (status, Json(body)).into_response()
    }
}

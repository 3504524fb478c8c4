//! Mapping of core errors onto HTTP responses

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use muxbridge_core::BridgeError;
use serde::{Deserialize, Serialize};

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error wrapping a [`BridgeError`]
#[derive(Debug)]
pub struct ApiError(pub BridgeError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BridgeError::Validation(_) => StatusCode::BAD_REQUEST,
            BridgeError::ServerNotFound(_)
            | BridgeError::SessionNotFound(_)
            | BridgeError::WindowNotFound { .. } => StatusCode::NOT_FOUND,
            BridgeError::InvariantViolation(_) => StatusCode::CONFLICT,
            BridgeError::Connection(_) => StatusCode::BAD_GATEWAY,
            BridgeError::CommandTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(BridgeError::Validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(BridgeError::Validation(format!(
            "Invalid path: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = %status, error = %self.0, "Request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

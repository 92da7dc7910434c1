//! API error shape shared by all JSON endpoints.
//!
//! Internal failures are logged server-side and answered with a generic
//! message.
use crate::registry::RegistryError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
        },
    }
}

pub fn api_not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", message)
}

pub fn api_conflict(code: &str, message: &str) -> ApiError {
    api_error(StatusCode::CONFLICT, code, message)
}

pub fn api_validation_error(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

pub fn api_internal(message: &str, err: &RegistryError) -> ApiError {
    tracing::error!(error = ?err, "site registry error");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match &err {
            RegistryError::NotFound(what) => api_not_found(&format!("{what} not found")),
            RegistryError::Conflict(what) => api_conflict("already_exists", what),
            RegistryError::Reserved(domain) => api_conflict(
                "reserved_domain",
                &format!("{domain} is the platform's default domain"),
            ),
            RegistryError::Unexpected(_) => api_internal("site registry unavailable", &err),
        }
    }
}

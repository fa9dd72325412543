//! JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use citerag_core::CiteRagError;
use serde_json::json;

/// A failure reported before any response body has been sent
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Validation → 400, unreadable upload → 422, provider → 502, anything else → 500
pub fn status_for(err: &CiteRagError) -> StatusCode {
    match err {
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        CiteRagError::Pdf(_) => StatusCode::UNPROCESSABLE_ENTITY,
        e if e.provider_error().is_some() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<CiteRagError> for ApiError {
    fn from(err: CiteRagError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", err);
        } else {
            tracing::debug!("Rejected request: {}", err);
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

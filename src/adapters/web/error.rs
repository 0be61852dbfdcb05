//! HTTP error responses for web adapter.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::error::AnalystError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub fn status_from_error(err: &AnalystError) -> StatusCode {
    match err {
        AnalystError::NotFound { .. } | AnalystError::UnknownTool { .. } => StatusCode::NOT_FOUND,
        AnalystError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AnalystError::InvalidInput { .. } | AnalystError::Csv { .. } => StatusCode::BAD_REQUEST,
        AnalystError::Unsupported { .. } => StatusCode::NOT_IMPLEMENTED,
        AnalystError::ConfigParse { .. }
        | AnalystError::ConfigInvalid { .. }
        | AnalystError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<AnalystError> for WebError {
    fn from(err: AnalystError) -> Self {
        Self::new(status_from_error(&err), err.to_string())
    }
}

impl From<JsonRejection> for WebError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for WebError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "request failed");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

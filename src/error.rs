use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Error type shared by the store and the HTTP handlers.
///
/// Each variant maps to an HTTP status and to the envelope `status` field:
/// `"fail"` for caller mistakes, `"error"` for server faults.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request shape is invalid. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// A uniqueness constraint rejected the write. HTTP 400.
    #[error("{0}")]
    Conflict(String),

    /// Identity does not exist. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Known route, unsupported method. HTTP 405.
    #[error("{0}")]
    MethodNotAllowed(String),

    /// Database failure. HTTP 500.
    #[error("{0}")]
    Storage(String),

    /// Anything else. HTTP 500.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn envelope_status(&self) -> &'static str {
        if self.status_code().is_server_error() {
            "error"
        } else {
            "fail"
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        ApiError::Storage(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        let body = json!({
            "status": self.envelope_status(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_mapping() {
        assert_eq!(ApiError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Conflict("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::MethodNotAllowed("x".into()).status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ApiError::Storage("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn envelope_status_splits_fail_and_error() {
        assert_eq!(ApiError::Conflict("dup".into()).envelope_status(), "fail");
        assert_eq!(ApiError::NotFound("gone".into()).envelope_status(), "fail");
        assert_eq!(ApiError::Storage("disk".into()).envelope_status(), "error");
    }

    #[test]
    fn display_is_just_message() {
        assert_eq!(
            ApiError::NotFound("Student not found".into()).to_string(),
            "Student not found"
        );
    }
}

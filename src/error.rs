//! HTTP-facing error type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::users::repo::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The record was stored but the cached directory could not be reloaded.
    #[error("user {user} was saved but the directory could not be refreshed: {reason}")]
    StaleDirectory { user: String, reason: String },
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(key) => {
                AppError::Conflict(format!("user {} already exists", key))
            }
            StoreError::Unavailable(reason) => AppError::StoreUnavailable(reason),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
            AppError::StaleDirectory { .. } => (StatusCode::SERVICE_UNAVAILABLE, "stale_directory"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_http_errors() {
        let conflict: AppError = StoreError::Conflict("alice".into()).into();
        assert!(matches!(conflict, AppError::Conflict(ref m) if m.contains("alice")));

        let down: AppError = StoreError::Unavailable("connection refused".into()).into();
        assert!(matches!(down, AppError::StoreUnavailable(_)));
    }

    #[test]
    fn validation_error_is_bad_request() {
        let res = AppError::Validation("humanUser cannot be empty".into()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn stale_directory_is_service_unavailable() {
        let res = AppError::StaleDirectory {
            user: "bob".into(),
            reason: "timeout".into(),
        }
        .into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

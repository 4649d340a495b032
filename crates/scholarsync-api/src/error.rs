//! API error types and JSON error response formatting.
//!
//! ApiError provides a consistent JSON error response format across all
//! endpoints, mapping internal errors to appropriate HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use scholarsync_chat::ChatError;
use scholarsync_core::error::ScholarError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid parameters.
    BadRequest(String),
    /// 404 Not Found - resource does not exist.
    NotFound(String),
    /// 409 Conflict - a chat turn is already running.
    Conflict(String),
    /// 500 Internal Server Error. The detail is logged, never returned.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ScholarError> for ApiError {
    fn from(err: ScholarError) -> Self {
        match err {
            ScholarError::Validation(msg) => ApiError::BadRequest(msg),
            ScholarError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::TurnInFlight(_) => ApiError::Conflict(err.to_string()),
            ChatError::MessageTooLong(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_internal_error_is_sanitized() {
        let resp = ApiError::Internal("near \"DROP\": syntax error".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "internal_error");
        assert_eq!(json["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let resp = ApiError::from(ScholarError::NotFound("project 9".to_string())).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["message"], "project 9 not found");
    }

    #[test]
    fn test_scholar_error_mapping() {
        assert!(matches!(
            ApiError::from(ScholarError::Validation("blank".to_string())),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(ScholarError::Storage("locked".to_string())),
            ApiError::Internal(_)
        ));
    }

    #[test]
    fn test_chat_error_mapping() {
        assert!(matches!(
            ApiError::from(ChatError::TurnInFlight(1)),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(ChatError::MessageTooLong(10)),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(ChatError::SessionMismatch {
                session: 1,
                project: 2,
            }),
            ApiError::Internal(_)
        ));
    }
}

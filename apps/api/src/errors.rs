use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A required secret or setting is missing for the requested operation.
    #[error("Misconfigured: {0}")]
    Misconfigured(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Sheets error: {0}")]
    Sheets(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code, also recorded in batch error digests.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Misconfigured(_) => "MISCONFIGURED",
            AppError::Llm(_) => "LLM_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Sheets(_) => "SHEETS_ERROR",
            AppError::Chat(_) => "CHAT_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(reason) => {
                tracing::warn!("Rejected request: {reason}");
                (StatusCode::UNAUTHORIZED, reason.clone())
            }
            AppError::Misconfigured(msg) => {
                tracing::error!("Misconfigured: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Sheets(msg) => {
                tracing::error!("Sheets error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "The spreadsheet service failed".to_string(),
                )
            }
            AppError::Chat(msg) => {
                tracing::error!("Chat error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "The chat service failed".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_maps_to_401() {
        let response = AppError::Unauthorized("Invalid signature".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_misconfigured_maps_to_500() {
        let response = AppError::Misconfigured("Signing secret not configured".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(AppError::Llm("boom".into()).code(), "LLM_ERROR");
        assert_eq!(AppError::Storage("boom".into()).code(), "STORAGE_ERROR");
    }
}

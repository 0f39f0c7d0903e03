use axum::{
    response::{IntoResponse, Response},
    Json,
    http::StatusCode,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    success: bool,
    error: String,
    message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Rejected client input. `error` is a short label, `message` is shown to the user.
    #[error("{error}: {message}")]
    Validation { error: String, message: String },

    #[error("Failed to fetch data: {0}")]
    FetchError(String),

    #[error("LLM processing error: {0}")]
    LlmError(String),

    #[error("Error parsing content: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(error: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            error: error.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::Validation { error, message } => (StatusCode::BAD_REQUEST, error, message),
            AppError::FetchError(msg) => (StatusCode::BAD_GATEWAY, "Upstream fetch failed".to_string(), msg),
            AppError::LlmError(msg) => (StatusCode::BAD_GATEWAY, "AI provider error".to_string(), msg),
            AppError::ParseError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "Parse error".to_string(), msg),
            AppError::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error".to_string(), msg),
            AppError::Internal(msg) => {
                tracing::error!("Unexpected error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "Failed to generate gift recommendations. Please try again.".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            error,
            message,
        });

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::FetchError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let response = AppError::validation("Description too short", "at least 5 characters").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_maps_to_server_error() {
        let response = AppError::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

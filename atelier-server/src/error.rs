use atelier_core::GenerationError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Application-level error type for HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Generation(GenerationError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Generation(GenerationError::Failed(_)) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Generation(GenerationError::InvalidRequest(_)) => "INVALID_REQUEST",
            AppError::Generation(GenerationError::Failed(_)) => "GENERATION_FAILED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to the user. Failures are logged in full and
    /// reported generically.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Generation(GenerationError::InvalidRequest(msg)) => msg.clone(),
            AppError::Generation(GenerationError::Failed(err)) => {
                tracing::error!(error = ?err, "Generation failed");
                "Image generation failed. See the server log for details.".to_string()
            }
            AppError::NotFound(what) => format!("{what} not found"),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                "An internal error occurred".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.user_message(),
            "code": self.code(),
        });
        (self.status(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_is_a_client_error() {
        let err = AppError::from(GenerationError::InvalidRequest("steps out of range".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "INVALID_REQUEST");
        assert_eq!(err.user_message(), "steps out of range");
    }

    #[test]
    fn failures_do_not_leak_details() {
        let err = AppError::from(GenerationError::Failed(anyhow::anyhow!(
            "CUDA_ERROR_OUT_OF_MEMORY at /secret/path"
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "GENERATION_FAILED");
        assert!(!err.user_message().contains("secret"));
    }
}

use axum::http::StatusCode;
use thiserror::Error;

/// Common trait for all custom error types in the application
pub trait AppError: std::error::Error + Send + Sync + 'static {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get the error code for client-side handling
    fn error_code(&self) -> &'static str;

    /// Get optional suggested action for the user
    fn suggested_action(&self) -> Option<String> {
        None
    }
}

/// Implements IntoResponse for an AppError type.
/// Every error renders as `{"error", "code", "status"}` (plus `suggestion` when present).
macro_rules! impl_into_response {
    ($error_type:ty) => {
        impl axum::response::IntoResponse for $error_type {
            fn into_response(self) -> axum::response::Response {
                use crate::errors::AppError;
                use axum::response::Json;
                use serde_json::json;

                let status = self.status_code();
                if status.is_server_error() {
                    tracing::error!(code = self.error_code(), "{}", self);
                } else {
                    tracing::debug!(code = self.error_code(), "{}", self);
                }

                let mut body = json!({
                    "error": self.user_message(),
                    "code": self.error_code(),
                    "status": status.as_u16()
                });
                if let Some(suggestion) = self.suggested_action() {
                    body["suggestion"] = json!(suggestion);
                }

                (status, Json(body)).into_response()
            }
        }
    };
}

pub(crate) use impl_into_response;

/// Generic API error for cases where specific error types don't apply
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Internal server error: {message}")]
    InternalServerError { message: String },
}

impl AppError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            ApiError::BadRequest { message } => message.clone(),
            ApiError::InternalServerError { .. } => "An internal error occurred".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { .. } => "BAD_REQUEST",
            ApiError::InternalServerError { .. } => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl_into_response!(ApiError);

impl ApiError {
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::BadRequest { message: message.into() }
    }

    pub fn internal_server_error<S: Into<String>>(message: S) -> Self {
        Self::InternalServerError { message: message.into() }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal_server_error(err.to_string())
    }
}

// Submodules for entity-specific errors
pub mod document;
pub mod tag;

pub use document::DocumentError;
pub use tag::TagError;

use axum::http::StatusCode;
use thiserror::Error;

use super::{impl_into_response, AppError};

/// Errors related to tag management operations
#[derive(Error, Debug)]
pub enum TagError {
    #[error("Document {id} not found")]
    DocumentNotFound { id: i32 },

    #[error("Tag {id} not found")]
    TagNotFound { id: i32 },

    #[error("Tag name '{name}' is invalid: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError for TagError {
    fn status_code(&self) -> StatusCode {
        match self {
            TagError::DocumentNotFound { .. } | TagError::TagNotFound { .. } => StatusCode::NOT_FOUND,
            TagError::InvalidName { .. } => StatusCode::BAD_REQUEST,
            TagError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            TagError::DocumentNotFound { .. } => "Document not found".to_string(),
            TagError::TagNotFound { .. } => "Tag not found".to_string(),
            TagError::InvalidName { reason, .. } => format!("Invalid tag name: {}", reason),
            TagError::Database(_) => "An internal error occurred".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            TagError::DocumentNotFound { .. } => "TAG_DOCUMENT_NOT_FOUND",
            TagError::TagNotFound { .. } => "TAG_NOT_FOUND",
            TagError::InvalidName { .. } => "TAG_INVALID_NAME",
            TagError::Database(_) => "TAG_DATABASE_ERROR",
        }
    }
}

impl_into_response!(TagError);

impl TagError {
    pub fn invalid_name<S: Into<String>>(name: S, reason: S) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

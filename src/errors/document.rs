use axum::http::StatusCode;
use thiserror::Error;

use super::{impl_into_response, AppError};
use crate::extraction::ExtractionError;

/// Errors raised while uploading, reading or deleting documents
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("No filename provided")]
    MissingFilename,

    #[error("No file field in upload")]
    MissingFile,

    #[error("Malformed upload: {reason}")]
    MalformedUpload { reason: String },

    #[error("Only PDF files are allowed, got '{filename}'")]
    InvalidExtension { filename: String },

    #[error("Unsafe filename '{filename}'")]
    UnsafeFilename { filename: String },

    #[error("Filename is {length} characters long (max {max_length})")]
    FilenameTooLong { length: usize, max_length: usize },

    #[error("Document with filename '{filename}' already exists")]
    DuplicateFilename { filename: String },

    #[error("File size exceeds {max_size} bytes")]
    FileTooLarge { max_size: usize },

    #[error("Failed to process PDF: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Document {id} not found")]
    NotFound { id: i32 },

    #[error("Storage error: {0}")]
    Storage(anyhow::Error),

    #[error("Database error: {0}")]
    Database(anyhow::Error),
}

impl AppError for DocumentError {
    fn status_code(&self) -> StatusCode {
        match self {
            DocumentError::MissingFilename
            | DocumentError::MissingFile
            | DocumentError::MalformedUpload { .. }
            | DocumentError::InvalidExtension { .. }
            | DocumentError::UnsafeFilename { .. }
            | DocumentError::FilenameTooLong { .. } => StatusCode::BAD_REQUEST,
            DocumentError::DuplicateFilename { .. } => StatusCode::CONFLICT,
            DocumentError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            DocumentError::Extraction(e) if e.is_input_error() => StatusCode::BAD_REQUEST,
            DocumentError::Extraction(ExtractionError::Timeout { .. }) => StatusCode::BAD_REQUEST,
            DocumentError::Extraction(_) => StatusCode::SERVICE_UNAVAILABLE,
            DocumentError::NotFound { .. } => StatusCode::NOT_FOUND,
            DocumentError::Storage(_) | DocumentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            DocumentError::MissingFilename => "No filename provided".to_string(),
            DocumentError::MissingFile => "No file found in upload".to_string(),
            DocumentError::MalformedUpload { reason } => format!("Malformed upload: {}", reason),
            DocumentError::InvalidExtension { .. } => "Only PDF files are allowed".to_string(),
            DocumentError::UnsafeFilename { .. } => "Invalid filename".to_string(),
            DocumentError::FilenameTooLong { max_length, .. } => {
                format!("Filename too long (max {} characters)", max_length)
            }
            DocumentError::DuplicateFilename { filename } => {
                format!("A document named '{}' already exists", filename)
            }
            DocumentError::FileTooLarge { max_size } => format!("File size exceeds {} bytes", max_size),
            DocumentError::Extraction(e) => format!("Failed to process PDF: {}", e),
            DocumentError::NotFound { .. } => "Document not found".to_string(),
            DocumentError::Storage(_) | DocumentError::Database(_) => "An internal error occurred".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            DocumentError::MissingFilename => "DOCUMENT_MISSING_FILENAME",
            DocumentError::MissingFile => "DOCUMENT_MISSING_FILE",
            DocumentError::MalformedUpload { .. } => "DOCUMENT_MALFORMED_UPLOAD",
            DocumentError::InvalidExtension { .. } => "DOCUMENT_INVALID_EXTENSION",
            DocumentError::UnsafeFilename { .. } => "DOCUMENT_UNSAFE_FILENAME",
            DocumentError::FilenameTooLong { .. } => "DOCUMENT_FILENAME_TOO_LONG",
            DocumentError::DuplicateFilename { .. } => "DOCUMENT_DUPLICATE_FILENAME",
            DocumentError::FileTooLarge { .. } => "DOCUMENT_TOO_LARGE",
            DocumentError::Extraction(_) => "DOCUMENT_EXTRACTION_FAILED",
            DocumentError::NotFound { .. } => "DOCUMENT_NOT_FOUND",
            DocumentError::Storage(_) => "DOCUMENT_STORAGE_ERROR",
            DocumentError::Database(_) => "DOCUMENT_DATABASE_ERROR",
        }
    }

    fn suggested_action(&self) -> Option<String> {
        match self {
            DocumentError::DuplicateFilename { .. } => {
                Some("Rename the file or delete the existing document first".to_string())
            }
            DocumentError::FileTooLarge { .. } => Some("Split the PDF into smaller files".to_string()),
            _ => None,
        }
    }
}

impl_into_response!(DocumentError);

impl DocumentError {
    pub fn not_found(id: i32) -> Self {
        Self::NotFound { id }
    }

    pub fn duplicate_filename<S: Into<String>>(filename: S) -> Self {
        Self::DuplicateFilename { filename: filename.into() }
    }

    pub fn malformed_upload<S: Into<String>>(reason: S) -> Self {
        Self::MalformedUpload { reason: reason.into() }
    }

    /// True for the variants that reject an upload before anything is persisted.
    pub fn is_rejection(&self) -> bool {
        self.status_code().is_client_error()
    }
}

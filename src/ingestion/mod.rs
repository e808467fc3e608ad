pub mod document_ingestion;

pub use document_ingestion::{
    sanitize_filename, DocumentIngestionService, IngestionStage, ValidatedUpload, MAX_FILENAME_LENGTH,
    MAX_UPLOAD_BYTES,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The stored path stays in the logs; clients only see the io error.
    #[error("Cannot read uploaded file: {source}")]
    Unreadable {
        #[source]
        source: std::io::Error,
    },

    #[error("Not a PDF file: missing %PDF- header ({size} bytes)")]
    MissingHeader { size: usize },

    #[error("Invalid or corrupted PDF: {details}")]
    Parse { details: String },

    #[error("PDF text extraction timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Extraction worker pool is shut down")]
    PoolClosed,

    #[error("Extraction worker failed: {details}")]
    Worker { details: String },
}

impl ExtractionError {
    /// True when the input itself is at fault, as opposed to the worker pool.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ExtractionError::Unreadable { .. }
                | ExtractionError::MissingHeader { .. }
                | ExtractionError::Parse { .. }
        )
    }
}

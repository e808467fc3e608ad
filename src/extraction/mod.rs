/*!
 * PDF Text Extraction Worker
 *
 * Parsing a PDF is CPU bound and blocking, so it never runs on the async
 * request path. Each call takes a permit from a fixed-size pool and runs on
 * tokio's blocking thread pool; the permit is held until the parse finishes.
 */

pub mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

pub use error::ExtractionError;

/// PDF headers may be preceded by junk within the first kilobyte.
const HEADER_SEARCH_LIMIT: usize = 1024;
const PDF_HEADER: &[u8] = b"%PDF-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Text of every page concatenated in page order
    pub text: String,
    pub page_count: usize,
}

/// Bounded pool for blocking PDF parsing. Cloning shares the same pool.
#[derive(Clone)]
pub struct PdfExtractor {
    permits: Arc<Semaphore>,
    workers: usize,
    timeout: Duration,
}

impl PdfExtractor {
    pub fn new(workers: usize, timeout: Duration) -> Self {
        let workers = workers.max(1);
        info!("PDF extraction pool ready with {} workers", workers);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            timeout,
        }
    }

    /// Extract the text and page count of the PDF at `path`.
    pub async fn extract(&self, path: impl AsRef<Path>) -> Result<ExtractedText, ExtractionError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ExtractionError::PoolClosed)?;

        debug!("Extracting text from {}", path.display());
        let start = Instant::now();
        let worker_path = path.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            extract_text_from_file(&worker_path)
        });

        let result = match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) if join_err.is_panic() => Err(ExtractionError::Parse {
                details: "PDF parser panicked on malformed input".to_string(),
            }),
            Ok(Err(join_err)) => Err(ExtractionError::Worker {
                details: join_err.to_string(),
            }),
            Err(_) => {
                warn!(
                    "Extraction of {} exceeded {}s, abandoning the result",
                    path.display(),
                    self.timeout.as_secs()
                );
                Err(ExtractionError::Timeout {
                    seconds: self.timeout.as_secs(),
                })
            }
        };

        match &result {
            Ok(extracted) => debug!(
                "Extracted {} pages ({} chars) from {} in {:?}",
                extracted.page_count,
                extracted.text.len(),
                path.display(),
                start.elapsed()
            ),
            Err(e) => debug!("Extraction failed for {}: {}", path.display(), e),
        }

        result
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Stop accepting work. Parses already running finish normally.
    pub fn shutdown(&self) {
        self.permits.close();
        info!("PDF extraction pool shut down");
    }
}

/// Blocking extraction from a file on disk.
pub fn extract_text_from_file(path: &Path) -> Result<ExtractedText, ExtractionError> {
    let bytes = std::fs::read(path).map_err(|source| {
        warn!("Cannot read {} for extraction: {}", path.display(), source);
        ExtractionError::Unreadable { source }
    })?;
    extract_text_from_bytes(&bytes)
}

/// Blocking extraction from PDF bytes.
pub fn extract_text_from_bytes(bytes: &[u8]) -> Result<ExtractedText, ExtractionError> {
    let pdf = pdf_body(bytes).ok_or(ExtractionError::MissingHeader { size: bytes.len() })?;

    // pdf-extract panics on some malformed inputs instead of returning an error
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(pdf))
        .map_err(|_| ExtractionError::Parse {
            details: "PDF parser panicked on malformed input".to_string(),
        })?
        .map_err(|e| ExtractionError::Parse {
            details: e.to_string(),
        })?;

    Ok(ExtractedText {
        page_count: pages.len(),
        text: pages.concat(),
    })
}

/// Returns the data starting at the `%PDF-` header, if one is present.
pub fn pdf_body(data: &[u8]) -> Option<&[u8]> {
    let search = &data[..data.len().min(HEADER_SEARCH_LIMIT)];
    search
        .windows(PDF_HEADER.len())
        .position(|window| window == PDF_HEADER)
        .map(|offset| &data[offset..])
}

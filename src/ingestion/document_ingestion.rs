/*!
 * Document Ingestion Pipeline
 *
 * Every upload moves through the same stages:
 * Received -> Validated -> StoredOnDisk -> Extracted -> Persisted,
 * or ends early as Rejected (client error) or Failed (server error).
 * Once the file is on disk, every failing path removes it again before the
 * error is returned.
 */

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::db::documents::FILENAME_UNIQUE_CONSTRAINT;
use crate::db::{is_unique_violation, Database};
use crate::errors::DocumentError;
use crate::extraction::PdfExtractor;
use crate::models::{Document, NewDocument};
use crate::services::file_service::FileService;

/// Largest accepted upload: 50 MiB
pub const MAX_UPLOAD_BYTES: usize = 52_428_800;

/// Matches the `documents.filename` column width
pub const MAX_FILENAME_LENGTH: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionStage {
    Received,
    Validated,
    StoredOnDisk,
    Extracted,
    Persisted,
    Rejected,
    Failed,
}

impl IngestionStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IngestionStage::Persisted | IngestionStage::Rejected | IngestionStage::Failed
        )
    }
}

impl fmt::Display for IngestionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestionStage::Received => "received",
            IngestionStage::Validated => "validated",
            IngestionStage::StoredOnDisk => "stored_on_disk",
            IngestionStage::Extracted => "extracted",
            IngestionStage::Persisted => "persisted",
            IngestionStage::Rejected => "rejected",
            IngestionStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks and logs the stage of a single upload.
#[derive(Debug)]
struct IngestionTrace {
    label: String,
    stage: IngestionStage,
}

impl IngestionTrace {
    fn new(label: &str) -> Self {
        debug!("Upload '{}': {}", label, IngestionStage::Received);
        Self {
            label: label.to_string(),
            stage: IngestionStage::Received,
        }
    }

    fn advance(&mut self, next: IngestionStage) {
        debug!("Upload '{}': {} -> {}", self.label, self.stage, next);
        self.stage = next;
    }

    /// Ends the upload with `err`, choosing Rejected or Failed by its status.
    fn finish_with(&mut self, err: DocumentError) -> DocumentError {
        if err.is_rejection() {
            self.advance(IngestionStage::Rejected);
            warn!("Rejected upload '{}': {}", self.label, err);
        } else {
            self.advance(IngestionStage::Failed);
            error!("Upload '{}' failed: {}", self.label, err);
        }
        err
    }
}

/// An upload whose filename passed validation and did not collide with an
/// existing document at the time of the check.
#[derive(Debug)]
pub struct ValidatedUpload {
    filename: String,
    trace: IngestionTrace,
}

impl ValidatedUpload {
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

/// Validate a client supplied filename and reduce it to a safe basename.
///
/// Rejects a missing or blank name and anything without a `.pdf` extension
/// (any case, non-empty stem). Names that carry a directory component or
/// `..` are rejected, as are names longer than [`MAX_FILENAME_LENGTH`]
/// characters.
pub fn sanitize_filename(raw: Option<&str>) -> Result<String, DocumentError> {
    let raw = match raw {
        Some(name) if !name.trim().is_empty() => name,
        _ => return Err(DocumentError::MissingFilename),
    };

    let is_pdf = Path::new(raw)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(DocumentError::InvalidExtension {
            filename: raw.to_string(),
        });
    }

    let basename = raw.rsplit(&['/', '\\'][..]).next().unwrap_or_default();
    if basename != raw || basename.contains("..") || basename.contains('\0') {
        return Err(DocumentError::UnsafeFilename {
            filename: raw.to_string(),
        });
    }

    let length = basename.chars().count();
    if length > MAX_FILENAME_LENGTH {
        return Err(DocumentError::FilenameTooLong {
            length,
            max_length: MAX_FILENAME_LENGTH,
        });
    }

    Ok(basename.to_string())
}

#[derive(Clone)]
pub struct DocumentIngestionService {
    db: Database,
    file_service: FileService,
    extractor: PdfExtractor,
}

impl DocumentIngestionService {
    pub fn new(db: Database, file_service: FileService, extractor: PdfExtractor) -> Self {
        Self {
            db,
            file_service,
            extractor,
        }
    }

    /// Filename checks and the duplicate lookup. Nothing is written yet, so
    /// an upload body can be refused before it is read.
    pub async fn validate(&self, raw_filename: Option<&str>) -> Result<ValidatedUpload, DocumentError> {
        let mut trace = IngestionTrace::new(raw_filename.unwrap_or("<none>"));

        let filename = sanitize_filename(raw_filename).map_err(|e| trace.finish_with(e))?;

        let exists = self
            .db
            .filename_exists(&filename)
            .await
            .map_err(|e| trace.finish_with(DocumentError::Database(e)))?;
        if exists {
            return Err(trace.finish_with(DocumentError::duplicate_filename(filename)));
        }

        trace.advance(IngestionStage::Validated);
        Ok(ValidatedUpload { filename, trace })
    }

    /// Store, extract and persist a validated upload.
    pub async fn ingest(&self, upload: ValidatedUpload, data: &[u8]) -> Result<Document, DocumentError> {
        let ValidatedUpload { filename, mut trace } = upload;

        if data.len() > MAX_UPLOAD_BYTES {
            return Err(trace.finish_with(DocumentError::FileTooLarge {
                max_size: MAX_UPLOAD_BYTES,
            }));
        }

        // Held until the document row is committed or the file is removed
        let Some(_reservation) = self.file_service.reserve(&filename) else {
            return Err(trace.finish_with(DocumentError::duplicate_filename(filename)));
        };

        self.file_service
            .ensure_upload_dir()
            .await
            .map_err(|e| trace.finish_with(DocumentError::Storage(e)))?;

        let path = self
            .store_file(&filename, data)
            .await
            .map_err(|e| trace.finish_with(e))?;
        trace.advance(IngestionStage::StoredOnDisk);

        let extracted = match self.extractor.extract(&path).await {
            Ok(extracted) => extracted,
            Err(e) => {
                self.remove_stored_file(&path).await;
                return Err(trace.finish_with(DocumentError::Extraction(e)));
            }
        };
        trace.advance(IngestionStage::Extracted);

        let new_document = NewDocument {
            filename: filename.clone(),
            // Postgres text columns cannot hold NUL
            content: extracted.text.replace('\0', ""),
            file_size: data.len() as i64,
            page_count: i32::try_from(extracted.page_count).unwrap_or(i32::MAX),
        };

        let document = match self.db.create_document(&new_document).await {
            Ok((document, _status)) => document,
            Err(e) => {
                self.remove_stored_file(&path).await;
                let err = if is_unique_violation(&e, FILENAME_UNIQUE_CONSTRAINT) {
                    DocumentError::duplicate_filename(filename)
                } else {
                    DocumentError::Database(e)
                };
                return Err(trace.finish_with(err));
            }
        };
        trace.advance(IngestionStage::Persisted);

        info!(
            "Ingested document {} '{}' ({} bytes, {} pages)",
            document.id, document.filename, document.file_size, document.page_count
        );
        Ok(document)
    }

    /// Runs the whole pipeline on an already buffered upload.
    pub async fn ingest_bytes(&self, raw_filename: Option<&str>, data: &[u8]) -> Result<Document, DocumentError> {
        let upload = self.validate(raw_filename).await?;
        self.ingest(upload, data).await
    }

    /// Writes the upload under its final name. A file already there with no
    /// document row is left over from an upload that never committed and is
    /// replaced; one that belongs to a document is a conflict.
    async fn store_file(&self, filename: &str, data: &[u8]) -> Result<PathBuf, DocumentError> {
        match self.file_service.save_file(filename, data).await {
            Ok(path) => return Ok(path),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(storage_error(filename, e)),
        }

        if self.db.filename_exists(filename).await.map_err(DocumentError::Database)? {
            return Err(DocumentError::duplicate_filename(filename));
        }

        let stale = self.file_service.file_path(filename);
        warn!("Replacing stale file {} with no document row", stale.display());
        if !self.file_service.delete_file(&stale).await {
            return Err(DocumentError::Storage(anyhow::anyhow!(
                "Could not remove stale file {}",
                stale.display()
            )));
        }

        match self.file_service.save_file(filename, data).await {
            Ok(path) => Ok(path),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(DocumentError::duplicate_filename(filename)),
            Err(e) => Err(storage_error(filename, e)),
        }
    }

    async fn remove_stored_file(&self, path: &Path) {
        if !self.file_service.delete_file(path).await {
            error!("Could not clean up {} after a failed upload", path.display());
        }
    }
}

fn storage_error(filename: &str, err: std::io::Error) -> DocumentError {
    DocumentError::Storage(anyhow::Error::new(err).context(format!("Failed to store '{}'", filename)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::ExtractionError;
    use crate::test_utils::lazy_database;
    use std::time::Duration;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> DocumentIngestionService {
        DocumentIngestionService::new(
            lazy_database(),
            FileService::new(dir.path().join("uploads")),
            PdfExtractor::new(1, Duration::from_secs(30)),
        )
    }

    fn validated(filename: &str) -> ValidatedUpload {
        let mut trace = IngestionTrace::new(filename);
        trace.advance(IngestionStage::Validated);
        ValidatedUpload {
            filename: filename.to_string(),
            trace,
        }
    }

    #[test]
    fn test_sanitize_accepts_plain_pdf_names() {
        assert_eq!(sanitize_filename(Some("report.pdf")).unwrap(), "report.pdf");
        assert_eq!(sanitize_filename(Some("Scan 2024.PDF")).unwrap(), "Scan 2024.PDF");
        assert_eq!(sanitize_filename(Some("a.b.Pdf")).unwrap(), "a.b.Pdf");
    }

    #[test]
    fn test_sanitize_missing_filename() {
        assert!(matches!(sanitize_filename(None), Err(DocumentError::MissingFilename)));
        assert!(matches!(sanitize_filename(Some("")), Err(DocumentError::MissingFilename)));
        assert!(matches!(sanitize_filename(Some("   ")), Err(DocumentError::MissingFilename)));
    }

    #[test]
    fn test_sanitize_requires_pdf_extension() {
        for name in ["notes.txt", "report.pdf.exe", "pdf", "archive.pdfx", ".pdf", ".PDF"] {
            assert!(
                matches!(sanitize_filename(Some(name)), Err(DocumentError::InvalidExtension { .. })),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_sanitize_rejects_path_traversal() {
        for name in [
            "../etc/passwd.pdf",
            "dir/report.pdf",
            "..\\windows\\report.pdf",
            "C:\\temp\\report.pdf",
            "report..pdf",
            "/abs/report.pdf",
        ] {
            assert!(
                matches!(sanitize_filename(Some(name)), Err(DocumentError::UnsafeFilename { .. })),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_sanitize_rejects_overlong_names() {
        let name = format!("{}.pdf", "a".repeat(MAX_FILENAME_LENGTH));
        assert!(matches!(
            sanitize_filename(Some(&name)),
            Err(DocumentError::FilenameTooLong { .. })
        ));

        let name = format!("{}.pdf", "a".repeat(MAX_FILENAME_LENGTH - 4));
        assert_eq!(sanitize_filename(Some(&name)).unwrap(), name);
    }

    #[test]
    fn test_terminal_stages() {
        assert!(IngestionStage::Persisted.is_terminal());
        assert!(IngestionStage::Rejected.is_terminal());
        assert!(IngestionStage::Failed.is_terminal());
        assert!(!IngestionStage::StoredOnDisk.is_terminal());
        assert_eq!(IngestionStage::StoredOnDisk.to_string(), "stored_on_disk");
    }

    #[tokio::test]
    async fn test_corrupt_pdf_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let err = service
            .ingest(validated("broken.pdf"), b"%PDF-1.4\nthis is not a real pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentError::Extraction(ExtractionError::Parse { .. })));
        assert!(err.is_rejection());
        assert!(!dir.path().join("uploads").join("broken.pdf").exists());
    }

    #[tokio::test]
    async fn test_non_pdf_content_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let err = service
            .ingest(validated("fake.pdf"), b"plain text pretending to be a pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentError::Extraction(ExtractionError::MissingHeader { .. })));
        assert!(!dir.path().join("uploads").join("fake.pdf").exists());
    }

    #[tokio::test]
    async fn test_oversized_upload_is_refused_before_writing() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let data = vec![0u8; MAX_UPLOAD_BYTES + 1];

        let err = service.ingest(validated("big.pdf"), &data).await.unwrap_err();

        assert!(matches!(err, DocumentError::FileTooLarge { .. }));
        assert!(!dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn test_upload_in_progress_for_same_name_is_a_conflict() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let uploads = dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        std::fs::write(uploads.join("taken.pdf"), b"first upload").unwrap();

        let _in_progress = service.file_service.reserve("taken.pdf").unwrap();
        let err = service
            .ingest(validated("taken.pdf"), b"%PDF-1.4 second upload")
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentError::DuplicateFilename { .. }));
        assert_eq!(std::fs::read(uploads.join("taken.pdf")).unwrap(), b"first upload");
    }

    #[tokio::test]
    async fn test_failed_upload_releases_its_name() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let _ = service
            .ingest(validated("retry.pdf"), b"%PDF-1.4\nnot a real pdf")
            .await
            .unwrap_err();

        assert!(service.file_service.reserve("retry.pdf").is_some());
    }

    #[tokio::test]
    async fn test_validate_rejects_before_touching_database() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let err = service.validate(Some("../secret.pdf")).await.unwrap_err();
        assert!(matches!(err, DocumentError::UnsafeFilename { .. }));

        let err = service.validate(Some("notes.txt")).await.unwrap_err();
        assert!(matches!(err, DocumentError::InvalidExtension { .. }));
    }
}

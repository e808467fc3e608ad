use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Suffix of in-progress writes. Sanitized names always end in `.pdf`, so
/// these never collide with a stored document.
const PARTIAL_SUFFIX: &str = ".part";

static PARTIAL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Stores uploaded files flat under the content directory, named by their
/// sanitized filename.
#[derive(Clone, Debug)]
pub struct FileService {
    upload_dir: PathBuf,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Exclusive claim on a filename for the duration of one upload. Released
/// on drop.
#[derive(Debug)]
pub struct FileReservation {
    filename: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Drop for FileReservation {
    fn drop(&mut self) {
        let mut names = match self.in_flight.lock() {
            Ok(names) => names,
            Err(poisoned) => poisoned.into_inner(),
        };
        names.remove(&self.filename);
    }
}

impl FileService {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Create the content directory if it is missing
    pub async fn ensure_upload_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.upload_dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", self.upload_dir.display()))?;
        debug!("Ensured upload directory exists: {}", self.upload_dir.display());
        Ok(())
    }

    /// Path a sanitized filename is stored at
    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.upload_dir.join(filename)
    }

    /// Claims `filename` for one upload in this process. Returns None while
    /// another upload holds it.
    pub fn reserve(&self, filename: &str) -> Option<FileReservation> {
        let mut names = match self.in_flight.lock() {
            Ok(names) => names,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !names.insert(filename.to_string()) {
            return None;
        }

        Some(FileReservation {
            filename: filename.to_string(),
            in_flight: self.in_flight.clone(),
        })
    }

    /// Write `data` under `filename` without ever overwriting. The bytes go
    /// to a private partial file first and are then hard-linked into place,
    /// so the final name only appears once it is complete. Fails with
    /// `ErrorKind::AlreadyExists` if the name is taken.
    pub async fn save_file(&self, filename: &str, data: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.file_path(filename);
        let partial = self.partial_path();

        let linked = async {
            write_new(&partial, data).await?;
            fs::hard_link(&partial, &path).await
        }
        .await;
        self.delete_file(&partial).await;

        if let Err(e) = linked {
            if e.kind() != ErrorKind::AlreadyExists {
                warn!("Failed writing {}: {}", path.display(), e);
            }
            return Err(e);
        }

        info!("Stored {} ({} bytes)", path.display(), data.len());
        Ok(path)
    }

    fn partial_path(&self) -> PathBuf {
        let n = PARTIAL_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.upload_dir
            .join(format!(".upload-{}-{}{}", std::process::id(), n, PARTIAL_SUFFIX))
    }

    pub async fn read_file(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.file_path(filename);
        fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    pub async fn file_exists(&self, filename: &str) -> bool {
        fs::try_exists(self.file_path(filename)).await.unwrap_or(false)
    }

    /// Remove a stored file. A missing file counts as removed; other
    /// failures are logged and reported as `false`.
    pub async fn delete_file(&self, path: &Path) -> bool {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                warn!("Failed to delete {}: {}", path.display(), e);
                false
            }
        }
    }
}

async fn write_new(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(data).await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service() -> (TempDir, FileService) {
        let dir = TempDir::new().unwrap();
        let service = FileService::new(dir.path().join("uploads"));
        (dir, service)
    }

    #[tokio::test]
    async fn test_save_and_read_file() {
        let (_dir, service) = service();
        service.ensure_upload_dir().await.unwrap();

        let path = service.save_file("report.pdf", b"%PDF-1.4 data").await.unwrap();
        assert_eq!(path, service.upload_dir().join("report.pdf"));
        assert!(service.file_exists("report.pdf").await);
        assert_eq!(service.read_file("report.pdf").await.unwrap(), b"%PDF-1.4 data");
    }

    #[tokio::test]
    async fn test_save_refuses_to_overwrite() {
        let (_dir, service) = service();
        service.ensure_upload_dir().await.unwrap();

        service.save_file("report.pdf", b"first").await.unwrap();
        let err = service.save_file("report.pdf", b"second").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(service.read_file("report.pdf").await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_save_without_directory_fails() {
        let (_dir, service) = service();
        let err = service.save_file("report.pdf", b"data").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_file_is_idempotent() {
        let (_dir, service) = service();
        service.ensure_upload_dir().await.unwrap();
        let path = service.save_file("gone.pdf", b"data").await.unwrap();

        assert!(service.delete_file(&path).await);
        assert!(!service.file_exists("gone.pdf").await);
        assert!(service.delete_file(&path).await);
    }

    #[tokio::test]
    async fn test_save_leaves_no_partial_files() {
        let (_dir, service) = service();
        service.ensure_upload_dir().await.unwrap();

        service.save_file("one.pdf", b"first").await.unwrap();
        let _ = service.save_file("one.pdf", b"second").await.unwrap_err();

        let names: Vec<String> = std::fs::read_dir(service.upload_dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["one.pdf".to_string()]);
    }

    #[test]
    fn test_reservation_is_exclusive_until_dropped() {
        let (_dir, service) = service();
        let shared = service.clone();

        let first = service.reserve("report.pdf").unwrap();
        assert!(shared.reserve("report.pdf").is_none());
        assert!(shared.reserve("other.pdf").is_some());

        drop(first);
        assert!(shared.reserve("report.pdf").is_some());
    }
}

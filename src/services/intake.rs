//! Receipt upload intake.
//!
//! Validates one event submission and writes each image to the pending
//! prefix of the object store. Writes happen in input order and stop at the
//! first failure; objects already written stay in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::error::{PipelineError, ValidationError};
use crate::models::{receipt_key, EventDetails, ReceiptUpload};
use crate::storage::ObjectStore;
use crate::utils::{detect_image_mime, is_image};

/// Bytes read from a local file for content sniffing.
const HEADER_LEN: u64 = 8192;

/// One receipt that reached the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredReceipt {
    pub key: String,
    /// Display location, e.g. `s3://catering-receipts/new/...`.
    pub uri: String,
}

/// Summary of a successful intake.
#[derive(Debug, Clone)]
pub struct IntakeReport {
    pub event: EventDetails,
    pub stored: Vec<StoredReceipt>,
}

impl IntakeReport {
    pub fn keys(&self) -> Vec<&str> {
        self.stored.iter().map(|r| r.key.as_str()).collect()
    }

    /// Markdown summary shown after a successful upload.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("**Event Created & Files Uploaded Successfully!**\n\n");
        out.push_str(&format!("**Name:** {}\n", self.event.name));
        out.push_str(&format!("**Date:** {}\n\n", self.event.date.format("%Y-%m-%d")));
        out.push_str(&format!("**Uploaded Files ({}):**\n", self.stored.len()));
        for receipt in &self.stored {
            out.push_str(&format!("* `{}`\n", receipt.uri));
        }
        out
    }
}

/// Check event details and files before anything is written.
///
/// Order: name/date presence, file presence, date format, then image
/// content. The first failure wins.
pub fn validate_submission(
    name: &str,
    date: &str,
    files: &[ReceiptUpload],
) -> Result<EventDetails, ValidationError> {
    let event = validate_event(name, date, files.len())?;

    for (i, file) in files.iter().enumerate() {
        if !is_image(&file.bytes) {
            return Err(ValidationError::NotAnImage {
                index: i + 1,
                name: file.filename.clone(),
            });
        }
    }

    Ok(event)
}

/// Same checks as [`validate_submission`] for files still on local disk.
///
/// Only the head of each file is read for the image check.
pub async fn validate_paths(
    name: &str,
    date: &str,
    paths: &[PathBuf],
) -> Result<EventDetails, ValidationError> {
    let event = validate_event(name, date, paths.len())?;

    for (i, path) in paths.iter().enumerate() {
        let header = read_header(path)
            .await
            .map_err(|e| ValidationError::UnreadableFile {
                index: i + 1,
                name: display_name(path),
                message: e.to_string(),
            })?;
        if !is_image(&header) {
            return Err(ValidationError::NotAnImage {
                index: i + 1,
                name: display_name(path),
            });
        }
    }

    Ok(event)
}

fn validate_event(
    name: &str,
    date: &str,
    file_count: usize,
) -> Result<EventDetails, ValidationError> {
    let name = name.trim();
    let date = date.trim();
    if name.is_empty() || date.is_empty() {
        return Err(ValidationError::MissingEventDetails);
    }
    if file_count == 0 {
        return Err(ValidationError::NoFiles);
    }
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(date.to_string()))?;

    Ok(EventDetails {
        name: name.to_string(),
        date: parsed,
    })
}

async fn read_header(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = tokio::fs::File::open(path).await?;
    let mut header = Vec::with_capacity(HEADER_LEN as usize);
    file.take(HEADER_LEN).read_to_end(&mut header).await?;
    Ok(header)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Writes validated receipt uploads under the pending prefix.
pub struct IntakeService {
    store: Arc<dyn ObjectStore>,
    pending_prefix: String,
}

impl IntakeService {
    pub fn new(store: Arc<dyn ObjectStore>, pending_prefix: impl Into<String>) -> Self {
        Self {
            store,
            pending_prefix: pending_prefix.into(),
        }
    }

    /// Validate and store one event's receipts.
    pub async fn submit(
        &self,
        name: &str,
        date: &str,
        files: Vec<ReceiptUpload>,
    ) -> Result<IntakeReport, PipelineError> {
        let event = validate_submission(name, date, &files)?;
        debug!(
            "Storing {} receipts for event '{}' ({})",
            files.len(),
            event.name,
            event.date
        );

        let mut stored: Vec<StoredReceipt> = Vec::with_capacity(files.len());
        for (i, file) in files.into_iter().enumerate() {
            let index = i + 1;
            let key = receipt_key(&self.pending_prefix, &event, index);
            let content_type = detect_image_mime(&file.bytes);

            if let Err(source) = self.store.put(&key, file.bytes, content_type).await {
                return Err(PipelineError::Upload {
                    index,
                    key,
                    written: stored.into_iter().map(|r| r.key).collect(),
                    source,
                });
            }

            debug!("Stored {} as {}", file.filename, key);
            stored.push(StoredReceipt {
                uri: self.store.uri(&key),
                key,
            });
        }

        info!(
            "Event '{}' created with {} receipts",
            event.name,
            stored.len()
        );
        Ok(IntakeReport { event, stored })
    }

    /// Upload already-validated local files for `event`, in order.
    ///
    /// Pair with [`validate_paths`]; failure handling matches [`Self::submit`].
    pub async fn store_paths(
        &self,
        event: EventDetails,
        paths: &[PathBuf],
    ) -> Result<IntakeReport, PipelineError> {
        let mut stored: Vec<StoredReceipt> = Vec::with_capacity(paths.len());
        for (i, path) in paths.iter().enumerate() {
            let index = i + 1;
            let key = receipt_key(&self.pending_prefix, &event, index);

            if let Err(source) = self.store.upload_file(&key, path).await {
                return Err(PipelineError::Upload {
                    index,
                    key,
                    written: stored.into_iter().map(|r| r.key).collect(),
                    source,
                });
            }

            debug!("Uploaded {} as {}", path.display(), key);
            stored.push(StoredReceipt {
                uri: self.store.uri(&key),
                key,
            });
        }

        info!(
            "Event '{}' created with {} receipts",
            event.name,
            stored.len()
        );
        Ok(IntakeReport { event, stored })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::storage::{LocalObjectStore, ObjectEntry, StorageError};

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDRreceipt";

    fn png(name: &str) -> ReceiptUpload {
        ReceiptUpload::new(name, PNG.to_vec())
    }

    /// Records writes and fails the n-th one (1-based).
    struct FlakyStore {
        fail_on: usize,
        writes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ObjectStore for FlakyStore {
        fn uri(&self, key: &str) -> String {
            format!("mem://{}", key)
        }

        async fn list(&self, _prefix: &str) -> Result<Vec<ObjectEntry>, StorageError> {
            Ok(Vec::new())
        }

        async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::NotFound(key.to_string()))
        }

        async fn put(&self, key: &str, _: Vec<u8>, _: &str) -> Result<(), StorageError> {
            let mut writes = self.writes.lock().unwrap();
            if writes.len() + 1 == self.fail_on {
                return Err(StorageError::Backend("access denied".to_string()));
            }
            writes.push(key.to_string());
            Ok(())
        }

        async fn upload_file(&self, key: &str, _: &Path) -> Result<(), StorageError> {
            self.put(key, Vec::new(), "image/png").await
        }

        async fn copy(&self, _: &str, _: &str) -> Result<(), StorageError> {
            Ok(())
        }

        async fn delete(&self, _: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn flaky(fail_on: usize) -> Arc<FlakyStore> {
        Arc::new(FlakyStore {
            fail_on,
            writes: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_keys_in_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalObjectStore::new(dir.path()));
        let service = IntakeService::new(store.clone(), "new/");

        let report = service
            .submit("Summer BBQ", "2024-07-04", vec![png("a.png"), png("b.png")])
            .await
            .unwrap();

        assert_eq!(
            report.keys(),
            vec!["new/240704-summer-bbq-1.png", "new/240704-summer-bbq-2.png"]
        );
        assert_eq!(store.get("new/240704-summer-bbq-2.png").await.unwrap(), PNG);
    }

    #[tokio::test]
    async fn test_invalid_date_writes_nothing() {
        let store = flaky(usize::MAX);
        let service = IntakeService::new(store.clone(), "new/");

        let err = service
            .submit("Summer BBQ", "07/04/2024", vec![png("a.png")])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Validation(ValidationError::InvalidDate(_))
        ));
        assert_eq!(
            err.to_string(),
            "Error: Invalid date format. Please use YYYY-MM-DD."
        );
        assert!(store.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_files_writes_nothing() {
        let store = flaky(usize::MAX);
        let service = IntakeService::new(store.clone(), "new/");

        let err = service.submit("Picnic", "2025-01-02", vec![]).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(ValidationError::NoFiles)));
        assert!(store.writes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_validation_order() {
        // Missing details beat missing files and a bad date
        assert_eq!(
            validate_submission("", "bad", &[]).unwrap_err(),
            ValidationError::MissingEventDetails
        );
        assert_eq!(
            validate_submission("  ", "2024-07-04", &[png("a")]).unwrap_err(),
            ValidationError::MissingEventDetails
        );
        // Missing files beat a bad date
        assert_eq!(
            validate_submission("BBQ", "bad", &[]).unwrap_err(),
            ValidationError::NoFiles
        );
        // A bad date beats a non-image file
        let text = ReceiptUpload::new("notes.txt", b"hello".to_vec());
        assert!(matches!(
            validate_submission("BBQ", "2024-13-01", &[text.clone()]).unwrap_err(),
            ValidationError::InvalidDate(_)
        ));
        assert_eq!(
            validate_submission("BBQ", "2024-07-04", &[png("a"), text]).unwrap_err(),
            ValidationError::NotAnImage {
                index: 2,
                name: "notes.txt".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_validate_paths_checks_details_before_reading() {
        let missing = vec![PathBuf::from("/nonexistent/receipt.png")];
        assert_eq!(
            validate_paths("", "2024-07-04", &missing).await.unwrap_err(),
            ValidationError::MissingEventDetails
        );
        assert!(matches!(
            validate_paths("BBQ", "07/04/2024", &missing).await.unwrap_err(),
            ValidationError::InvalidDate(_)
        ));
        assert!(matches!(
            validate_paths("BBQ", "2024-07-04", &missing).await.unwrap_err(),
            ValidationError::UnreadableFile { index: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_validate_paths_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let receipt = dir.path().join("a.png");
        let notes = dir.path().join("notes.txt");
        std::fs::write(&receipt, PNG).unwrap();
        std::fs::write(&notes, b"hello").unwrap();

        let err = validate_paths("BBQ", "2024-07-04", &[receipt, notes])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotAnImage {
                index: 2,
                name: "notes.txt".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_store_paths_uploads_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.png");
        let second = dir.path().join("second.png");
        std::fs::write(&first, PNG).unwrap();
        std::fs::write(&second, b"\x89PNG\r\n\x1a\nsecond").unwrap();
        let paths = vec![first, second];

        let store = Arc::new(LocalObjectStore::new(dir.path().join("bucket")));
        let service = IntakeService::new(store.clone(), "new/");
        let event = validate_paths("Picnic", "2025-01-02", &paths).await.unwrap();
        let report = service.store_paths(event, &paths).await.unwrap();

        assert_eq!(
            report.keys(),
            vec!["new/250102-picnic-1.png", "new/250102-picnic-2.png"]
        );
        assert_eq!(
            store.get("new/250102-picnic-2.png").await.unwrap(),
            b"\x89PNG\r\n\x1a\nsecond"
        );
    }

    #[tokio::test]
    async fn test_failed_write_reports_file_and_keeps_prefix() {
        let store = flaky(2);
        let service = IntakeService::new(store.clone(), "new/");

        let err = service
            .submit(
                "Summer BBQ",
                "2024-07-04",
                vec![png("a"), png("b"), png("c")],
            )
            .await
            .unwrap_err();

        match &err {
            PipelineError::Upload {
                index,
                key,
                written,
                ..
            } => {
                assert_eq!(*index, 2);
                assert_eq!(key, "new/240704-summer-bbq-2.png");
                assert_eq!(written, &vec!["new/240704-summer-bbq-1.png".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_retryable());
        // No rollback, and nothing after the failure
        assert_eq!(
            *store.writes.lock().unwrap(),
            vec!["new/240704-summer-bbq-1.png".to_string()]
        );
    }

    #[tokio::test]
    async fn test_markdown_summary() {
        let store = flaky(usize::MAX);
        let service = IntakeService::new(store, "new/");
        let report = service
            .submit(" Picnic ", "2025-01-02", vec![png("a")])
            .await
            .unwrap();

        let md = report.to_markdown();
        assert!(md.starts_with("**Event Created & Files Uploaded Successfully!**"));
        assert!(md.contains("**Name:** Picnic\n"));
        assert!(md.contains("**Date:** 2025-01-02\n"));
        assert!(md.contains("**Uploaded Files (1):**\n"));
        assert!(md.contains("* `mem://new/250102-picnic-1.png`"));
    }
}

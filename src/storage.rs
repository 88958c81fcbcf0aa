//! Object storage for pending receipts and job tracking records.
//!
//! Two backends implement [`ObjectStore`]:
//! - `S3ObjectStore`: an S3 bucket (or any S3-compatible endpoint)
//! - `LocalObjectStore`: a directory tree, for development and tests
//!
//! Keys are `/`-separated. Listing returns keys in lexicographic order so a
//! batch run sees a stable sequence.

mod local;
mod s3;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::PipelineError;

pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;

/// Errors from an object store backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

impl ObjectEntry {
    /// Zero-byte objects are folder markers created by consoles and sync tools.
    pub fn is_placeholder(&self) -> bool {
        self.size == 0
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Human-readable location of a key, e.g. `s3://bucket/new/a.png`.
    fn uri(&self, key: &str) -> String;

    /// List every object whose key starts with `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<(), StorageError>;

    /// Upload a local file without buffering it in the caller.
    async fn upload_file(&self, key: &str, path: &Path) -> Result<(), StorageError>;

    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Move an object to a new key.
    async fn rename(&self, from: &str, to: &str) -> Result<(), StorageError> {
        self.copy(from, to).await?;
        self.delete(from).await
    }
}

/// Guess the content type to store a key with from its extension.
pub fn content_type_for(key: &str) -> String {
    mime_guess::from_path(key)
        .first_or_octet_stream()
        .to_string()
}

/// Build the configured object store.
pub async fn build_object_store(
    config: &StorageConfig,
) -> Result<Arc<dyn ObjectStore>, PipelineError> {
    match config.backend {
        StorageBackend::S3 => {
            if config.bucket.trim().is_empty() {
                return Err(PipelineError::Configuration(
                    "storage.bucket is empty (set S3_BUCKET_NAME)".to_string(),
                ));
            }
            tracing::debug!("Using S3 object store: bucket={}", config.bucket);
            Ok(Arc::new(S3ObjectStore::from_config(config).await))
        }
        StorageBackend::Local => {
            tracing::debug!(
                "Using local object store at {}",
                config.local_root.display()
            );
            Ok(Arc::new(LocalObjectStore::new(config.local_root.clone())))
        }
    }
}

//! Batch packaging.
//!
//! Turns every pending receipt into one line of a JSONL staging file. The
//! correlation id of each line is the object's storage key.

use std::path::Path;
use std::sync::Arc;

use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::BatchConfig;
use crate::error::PipelineError;
use crate::inference::BatchRequestLine;
use crate::storage::{ObjectEntry, ObjectStore};

/// A written staging file. The file is removed when this is dropped.
#[derive(Debug)]
pub struct StagedBatch {
    file: NamedTempFile,
    /// Correlation ids in the order their lines were written.
    pub custom_ids: Vec<String>,
}

impl StagedBatch {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> usize {
        self.custom_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.custom_ids.is_empty()
    }
}

#[derive(Debug)]
pub enum PackageOutcome {
    /// Nothing pending; a normal outcome, not an error.
    NoWork,
    Packaged(StagedBatch),
}

pub struct BatchPackager {
    store: Arc<dyn ObjectStore>,
    config: BatchConfig,
}

impl BatchPackager {
    pub fn new(store: Arc<dyn ObjectStore>, config: BatchConfig) -> Self {
        Self { store, config }
    }

    /// List pending receipts, skipping zero-byte folder markers.
    pub async fn list_pending(&self) -> Result<Vec<ObjectEntry>, PipelineError> {
        let prefix = &self.config.pending_prefix;
        let entries = self
            .store
            .list(prefix)
            .await
            .map_err(|e| PipelineError::storage(prefix.clone(), e))?;

        let total = entries.len();
        let pending: Vec<ObjectEntry> = entries
            .into_iter()
            .filter(|e| !e.is_placeholder())
            .collect();
        debug!(
            "Listed {} objects under {} ({} placeholders skipped)",
            total,
            prefix,
            total - pending.len()
        );
        Ok(pending)
    }

    /// Write one request line per entry, in the given order.
    ///
    /// Each object is downloaded, encoded and written before the next one is
    /// fetched. Any failure drops the partial staging file.
    pub async fn package(&self, entries: &[ObjectEntry]) -> Result<StagedBatch, PipelineError> {
        let staging_dir = self.config.staging_dir();
        tokio::fs::create_dir_all(&staging_dir).await?;
        let file = tempfile::Builder::new()
            .prefix("batch_job_")
            .suffix(".jsonl")
            .tempfile_in(&staging_dir)?;

        let mut writer = tokio::io::BufWriter::new(tokio::fs::File::from_std(file.reopen()?));
        let mut custom_ids = Vec::with_capacity(entries.len());

        for entry in entries {
            let bytes = self
                .store
                .get(&entry.key)
                .await
                .map_err(|e| PipelineError::storage(entry.key.clone(), e))?;

            let line = BatchRequestLine::for_receipt(entry.key.clone(), &bytes, &self.config);
            let mut json = serde_json::to_vec(&line)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            json.push(b'\n');
            writer.write_all(&json).await?;

            debug!("Packaged {} ({} bytes)", entry.key, bytes.len());
            custom_ids.push(entry.key.clone());
        }
        writer.flush().await?;

        info!(
            "Staged {} requests in {}",
            custom_ids.len(),
            file.path().display()
        );
        Ok(StagedBatch { file, custom_ids })
    }

    /// List and package in one step.
    pub async fn run(&self) -> Result<PackageOutcome, PipelineError> {
        let pending = self.list_pending().await?;
        if pending.is_empty() {
            return Ok(PackageOutcome::NoWork);
        }
        Ok(PackageOutcome::Packaged(self.package(&pending).await?))
    }
}

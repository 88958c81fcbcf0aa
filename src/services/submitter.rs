//! Batch submission and job tracking.

use std::sync::Arc;

use tracing::info;

use crate::config::BatchConfig;
use crate::error::PipelineError;
use crate::inference::{BatchService, CreateBatchRequest};
use crate::models::JobHandle;
use crate::services::packager::StagedBatch;
use crate::storage::ObjectStore;

/// Hands a staging file to the inference service and records the job.
pub struct BatchSubmitter {
    service: Arc<dyn BatchService>,
    store: Arc<dyn ObjectStore>,
    config: BatchConfig,
}

impl BatchSubmitter {
    pub fn new(
        service: Arc<dyn BatchService>,
        store: Arc<dyn ObjectStore>,
        config: BatchConfig,
    ) -> Self {
        Self {
            service,
            store,
            config,
        }
    }

    /// Upload, create the batch, then persist a `PENDING` handle.
    ///
    /// Any step failing fails the whole submission.
    pub async fn submit(&self, staged: &StagedBatch) -> Result<JobHandle, PipelineError> {
        let file_id = self.service.upload_batch_file(staged.path()).await?;

        let request = CreateBatchRequest {
            input_file_id: file_id,
            endpoint: self.config.endpoint.clone(),
            completion_window: self.config.completion_window.clone(),
        };
        let job = self.service.create_batch(&request).await?;

        let handle = JobHandle::pending(job.id);
        self.record(&handle).await?;
        info!(
            "Submitted batch job {} covering {} receipts",
            handle.job_id,
            staged.len()
        );
        Ok(handle)
    }

    /// Overwrite the tracking record with `handle`.
    pub async fn record(&self, handle: &JobHandle) -> Result<(), PipelineError> {
        let key = &self.config.tracking_key;
        let body = handle
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.store
            .put(key, body.into_bytes(), "application/json")
            .await
            .map_err(|e| PipelineError::storage(key.clone(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;
    use crate::services::packager::{BatchPackager, PackageOutcome};
    use crate::error::ErrorCategory;
    use crate::services::testing::{FaultyStore, RecordingBatchService};
    use crate::storage::LocalObjectStore;

    async fn staged_batch(store: Arc<LocalObjectStore>, config: &BatchConfig) -> StagedBatch {
        store
            .put("new/250102-picnic-1.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        match BatchPackager::new(store, config.clone()).run().await.unwrap() {
            PackageOutcome::Packaged(staged) => staged,
            PackageOutcome::NoWork => panic!("expected work"),
        }
    }

    fn config(dir: &std::path::Path) -> BatchConfig {
        BatchConfig {
            staging_dir: Some(dir.join("staging")),
            ..BatchConfig::default()
        }
    }

    #[tokio::test]
    async fn test_submit_records_pending_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalObjectStore::new(dir.path().join("bucket")));
        let config = config(dir.path());
        let staged = staged_batch(store.clone(), &config).await;

        let service = Arc::new(RecordingBatchService::new("batch_1"));
        let submitter = BatchSubmitter::new(service.clone(), store.clone(), config);
        let handle = submitter.submit(&staged).await.unwrap();

        assert_eq!(handle, JobHandle::pending("batch_1"));
        let requests = service.batch_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].endpoint, "/v1/chat/completions");
        assert_eq!(requests[0].completion_window, "24h");
        assert_eq!(requests[0].input_file_id, "file-1");

        let stored = store.get("job_tracking/latest_job.json").await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&stored).unwrap();
        assert_eq!(json, serde_json::json!({"job_id": "batch_1", "status": "PENDING"}));
    }

    #[tokio::test]
    async fn test_submit_overwrites_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalObjectStore::new(dir.path().join("bucket")));
        let config = config(dir.path());
        store
            .put(
                "job_tracking/latest_job.json",
                br#"{"job_id":"batch_old","status":"COMPLETED"}"#.to_vec(),
                "application/json",
            )
            .await
            .unwrap();
        let staged = staged_batch(store.clone(), &config).await;

        let service = Arc::new(RecordingBatchService::new("batch_new"));
        BatchSubmitter::new(service, store.clone(), config)
            .submit(&staged)
            .await
            .unwrap();

        let stored = store.get("job_tracking/latest_job.json").await.unwrap();
        let handle = JobHandle::from_json(&stored).unwrap();
        assert_eq!(handle.job_id, "batch_new");
        assert_eq!(handle.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_failure_writes_no_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalObjectStore::new(dir.path().join("bucket")));
        let config = config(dir.path());
        let staged = staged_batch(store.clone(), &config).await;

        let service = Arc::new(RecordingBatchService::failing_create());
        let err = BatchSubmitter::new(service, store.clone(), config)
            .submit(&staged)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Batch(_)));
        assert!(store.get("job_tracking/latest_job.json").await.is_err());
    }

    #[tokio::test]
    async fn test_upload_failure_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalObjectStore::new(dir.path().join("bucket")));
        let config = config(dir.path());
        let staged = staged_batch(store.clone(), &config).await;

        let service = Arc::new(RecordingBatchService::failing_upload());
        let err = BatchSubmitter::new(service.clone(), store.clone(), config)
            .submit(&staged)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Batch(_)));
        assert!(service.batch_requests().is_empty());
        assert!(store.get("job_tracking/latest_job.json").await.is_err());
    }

    #[tokio::test]
    async fn test_record_failure_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let local = Arc::new(LocalObjectStore::new(dir.path().join("bucket")));
        let config = config(dir.path());
        let staged = staged_batch(local.clone(), &config).await;
        let store = FaultyStore {
            fail_put_key: Some(config.tracking_key.clone()),
            ..FaultyStore::new(local.clone())
        };

        let service = Arc::new(RecordingBatchService::new("batch_9"));
        let err = BatchSubmitter::new(service.clone(), Arc::new(store), config)
            .submit(&staged)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Storage { .. }));
        assert_eq!(err.category(), ErrorCategory::TransientIo);
        assert_eq!(service.batch_requests().len(), 1);
        assert!(local.get("job_tracking/latest_job.json").await.is_err());
    }
}

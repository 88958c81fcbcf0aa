//! Scheduled batch workflow.
//!
//! `Idle -> Listing -> (NoWork | Packaging -> Submitting -> Done)`; any
//! failing step moves to `Failed`. Each run is a fresh workflow; nothing is
//! retried internally.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::{BatchConfig, SecretsConfig};
use crate::error::PipelineError;
use crate::inference::BatchConnector;
use crate::models::{archive_key, JobHandle};
use crate::secrets::{fetch_secret_field, SecretStore};
use crate::services::packager::{BatchPackager, StagedBatch};
use crate::services::submitter::BatchSubmitter;
use crate::storage::ObjectStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Listing,
    NoWork,
    Packaging,
    Submitting,
    Done,
    Failed,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Listing => "LISTING",
            Self::NoWork => "NO_WORK",
            Self::Packaging => "PACKAGING",
            Self::Submitting => "SUBMITTING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a successful submission did.
#[derive(Debug, Clone)]
pub struct SubmissionReport {
    pub job: JobHandle,
    /// Correlation ids of the submitted requests, in file order.
    pub custom_ids: Vec<String>,
    /// Keys moved to the archive prefix.
    pub archived: Vec<String>,
    pub archive_failures: usize,
}

impl fmt::Display for SubmissionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Successfully submitted job {} for {} files.",
            self.job.job_id,
            self.custom_ids.len()
        )
    }
}

#[derive(Debug, Clone)]
pub enum WorkflowOutcome {
    NoWork,
    Submitted(SubmissionReport),
    /// Packaged but not submitted.
    DryRun { custom_ids: Vec<String> },
}

pub struct BatchWorkflow {
    store: Arc<dyn ObjectStore>,
    secrets: Arc<dyn SecretStore>,
    connector: Arc<dyn BatchConnector>,
    secrets_config: SecretsConfig,
    config: BatchConfig,
    state: WorkflowState,
}

impl BatchWorkflow {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        secrets: Arc<dyn SecretStore>,
        connector: Arc<dyn BatchConnector>,
        secrets_config: SecretsConfig,
        config: BatchConfig,
    ) -> Self {
        Self {
            store,
            secrets,
            connector,
            secrets_config,
            config,
            state: WorkflowState::Idle,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    fn transition(&mut self, next: WorkflowState) {
        info!("Batch workflow: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Run the workflow once. Fails if this workflow already ran.
    pub async fn run(&mut self, dry_run: bool) -> Result<WorkflowOutcome, PipelineError> {
        if self.state != WorkflowState::Idle {
            return Err(PipelineError::Configuration(format!(
                "batch workflow already ran (state {})",
                self.state
            )));
        }

        let result = self.run_steps(dry_run).await;
        if let Err(ref e) = result {
            error!("Batch workflow failed ({}): {}", e.category(), e);
            self.transition(WorkflowState::Failed);
        }
        result
    }

    async fn run_steps(&mut self, dry_run: bool) -> Result<WorkflowOutcome, PipelineError> {
        // The credential is fetched once, before touching storage
        let service = if dry_run {
            None
        } else {
            let api_key = fetch_secret_field(
                self.secrets.as_ref(),
                &self.secrets_config.secret_name,
                &self.secrets_config.field,
            )
            .await?;
            Some(self.connector.connect(&api_key)?)
        };

        let packager = BatchPackager::new(self.store.clone(), self.config.clone());

        self.transition(WorkflowState::Listing);
        let pending = packager.list_pending().await?;
        if pending.is_empty() {
            info!("No new files under {}", self.config.pending_prefix);
            self.transition(WorkflowState::NoWork);
            return Ok(WorkflowOutcome::NoWork);
        }

        self.transition(WorkflowState::Packaging);
        let staged = packager.package(&pending).await?;

        let Some(service) = service else {
            self.transition(WorkflowState::Done);
            return Ok(WorkflowOutcome::DryRun {
                custom_ids: staged.custom_ids.clone(),
            });
        };

        self.transition(WorkflowState::Submitting);
        let submitter = BatchSubmitter::new(service, self.store.clone(), self.config.clone());
        let job = submitter.submit(&staged).await?;

        let (archived, archive_failures) = if self.config.archive_submitted {
            self.archive(&staged).await
        } else {
            (Vec::new(), 0)
        };

        self.transition(WorkflowState::Done);
        Ok(WorkflowOutcome::Submitted(SubmissionReport {
            job,
            custom_ids: staged.custom_ids.clone(),
            archived,
            archive_failures,
        }))
    }

    /// Move submitted objects out of the pending prefix.
    ///
    /// The job is already accepted at this point, so failures are logged and
    /// counted instead of failing the run.
    async fn archive(&self, staged: &StagedBatch) -> (Vec<String>, usize) {
        let mut archived = Vec::with_capacity(staged.len());
        let mut failures = 0;
        for key in &staged.custom_ids {
            let target = archive_key(
                key,
                &self.config.pending_prefix,
                &self.config.archive_prefix,
            );
            match self.store.rename(key, &target).await {
                Ok(()) => archived.push(target),
                Err(e) => {
                    warn!("Failed to archive {} to {}: {}", key, target, e);
                    failures += 1;
                }
            }
        }
        if failures > 0 {
            warn!(
                "{} of {} submitted objects were not archived and will be resubmitted next run",
                failures,
                staged.len()
            );
        }
        (archived, failures)
    }
}

//! Service layer for the receipt pipeline.
//!
//! This module contains domain logic separated from UI concerns.
//! Services are used by the CLI and the web server alike; every external
//! collaborator is injected as a trait object.

pub mod intake;
pub mod packager;
pub mod submitter;
pub mod workflow;

pub use intake::{validate_paths, validate_submission, IntakeReport, IntakeService, StoredReceipt};
pub use packager::{BatchPackager, PackageOutcome, StagedBatch};
pub use submitter::BatchSubmitter;
pub use workflow::{BatchWorkflow, SubmissionReport, WorkflowOutcome, WorkflowState};

//! Batch submission command (the scheduled entry point).

use std::sync::Arc;

use console::style;

use crate::cli::icons;
use crate::config::Config;
use crate::inference::OpenAiConnector;
use crate::secrets::build_secret_store;
use crate::services::{BatchWorkflow, WorkflowOutcome};
use crate::storage::build_object_store;

/// Package every pending receipt and submit one batch job.
///
/// Exits with an error on any failure so an external scheduler can re-run.
pub async fn cmd_submit(config: &Config, dry_run: bool) -> anyhow::Result<()> {
    let store = build_object_store(&config.storage).await?;
    let secrets = build_secret_store(&config.secrets).await;
    let connector = Arc::new(OpenAiConnector::new(
        config.batch.api_base.clone(),
        config.batch.request_timeout(),
    ));

    let mut workflow = BatchWorkflow::new(
        store,
        secrets,
        connector,
        config.secrets.clone(),
        config.batch.clone(),
    );

    match workflow.run(dry_run).await {
        Ok(WorkflowOutcome::NoWork) => {
            println!("{} No new files.", icons::info());
            Ok(())
        }
        Ok(WorkflowOutcome::DryRun { custom_ids }) => {
            println!(
                "{} Dry run: would submit {} requests",
                icons::info(),
                custom_ids.len()
            );
            for id in &custom_ids {
                println!("  {} {}", icons::dim_arrow(), id);
            }
            Ok(())
        }
        Ok(WorkflowOutcome::Submitted(report)) => {
            println!("{} {}", icons::success(), report);
            println!(
                "  {} Tracking record: {}",
                icons::dim_arrow(),
                config.batch.tracking_key
            );
            if config.batch.archive_submitted {
                println!(
                    "  {} Archived {} receipts to {}",
                    icons::dim_arrow(),
                    report.archived.len(),
                    config.batch.archive_prefix
                );
            }
            if report.archive_failures > 0 {
                eprintln!(
                    "{} {} receipts could not be archived and will be resubmitted",
                    icons::warn(),
                    report.archive_failures
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!(
                "{} Batch submission failed [{}]: {}",
                icons::error(),
                style(e.category()).bold(),
                e
            );
            if e.is_retryable() {
                eprintln!("  {} Safe to re-run", icons::dim_arrow());
            }
            Err(e.into())
        }
    }
}

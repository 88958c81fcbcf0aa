//! Receipt upload command.

use std::path::PathBuf;

use crate::cli::icons;
use crate::config::Config;
use crate::error::PipelineError;
use crate::services::{validate_paths, IntakeService};
use crate::storage::build_object_store;

/// Store local image files for one event, in the order given.
///
/// Everything is validated before the object store is built.
pub async fn cmd_upload(
    config: &Config,
    name: &str,
    date: &str,
    files: &[PathBuf],
) -> anyhow::Result<()> {
    let event = match validate_paths(name, date, files).await {
        Ok(event) => event,
        Err(e) => {
            eprintln!("{} {}", icons::error(), e);
            return Err(PipelineError::from(e).into());
        }
    };

    let store = build_object_store(&config.storage).await?;
    let intake = IntakeService::new(store, config.batch.pending_prefix.clone());

    match intake.store_paths(event, files).await {
        Ok(report) => {
            eprintln!(
                "{} Stored {} receipts for '{}'",
                icons::success(),
                report.stored.len(),
                report.event.name
            );
            println!("{}", report.to_markdown());
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", icons::error(), e);
            Err(e.into())
        }
    }
}

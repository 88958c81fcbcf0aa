//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod ocr;
mod serve;
mod submit;
mod upload;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_config_with_options, LoadOptions, OcrBackendKind};

#[derive(Parser)]
#[command(name = "receipts")]
#[command(about = "Receipt image intake and batch extraction pipeline")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the upload form web server
    Serve {
        /// Address to bind: port, host, or host:port
        #[arg(default_value = "127.0.0.1:3030")]
        bind: String,
    },

    /// Store receipt images for an event under the pending prefix
    Upload {
        /// Event name
        #[arg(short, long)]
        name: String,
        /// Event date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,
        /// Image files, stored in the order given
        files: Vec<PathBuf>,
    },

    /// Package pending receipts into a batch job and submit it
    Submit {
        /// Package and report without submitting or archiving
        #[arg(long)]
        dry_run: bool,
    },

    /// Extract fields from a single receipt image
    Ocr {
        /// Image to process
        #[arg(long)]
        filepath: PathBuf,
        /// Extractor to use: tesseract or vision (defaults to ocr.backend)
        #[arg(short, long)]
        backend: Option<OcrBackendKind>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as JSON
    Show,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
    };
    let config = load_config_with_options(options)
        .await
        .map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Serve { bind } => serve::cmd_serve(&config, &bind).await,
        Commands::Upload { name, date, files } => {
            upload::cmd_upload(&config, &name, &date, &files).await
        }
        Commands::Submit { dry_run } => submit::cmd_submit(&config, dry_run).await,
        Commands::Ocr { filepath, backend } => {
            let backend = backend.unwrap_or(config.ocr.backend);
            ocr::cmd_ocr(&config, &filepath, backend).await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => config_cmd::cmd_config_show(&config),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_upload() {
        let cli = Cli::try_parse_from([
            "receipts", "upload", "--name", "Summer BBQ", "--date", "2024-07-04", "a.png", "b.png",
        ])
        .unwrap();
        match cli.command {
            Commands::Upload { name, date, files } => {
                assert_eq!(name, "Summer BBQ");
                assert_eq!(date, "2024-07-04");
                assert_eq!(files, vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
            }
            _ => panic!("expected upload"),
        }
    }

    #[test]
    fn test_parse_ocr_backend() {
        let cli = Cli::try_parse_from([
            "receipts", "ocr", "--filepath", "r.jpg", "--backend", "vision",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ocr {
                backend: Some(OcrBackendKind::Vision),
                ..
            }
        ));

        assert!(Cli::try_parse_from(["receipts", "ocr"]).is_err());
        assert!(Cli::try_parse_from([
            "receipts", "ocr", "--filepath", "r.jpg", "--backend", "donut"
        ])
        .is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["receipts", "submit", "--dry-run", "-v", "-c", "r.toml"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("r.toml")));
        assert!(matches!(cli.command, Commands::Submit { dry_run: true }));
    }
}

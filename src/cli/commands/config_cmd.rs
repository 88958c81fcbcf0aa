//! Configuration management commands.

use crate::cli::icons;
use crate::config::Config;

/// Print the effective configuration (file plus environment) as JSON.
pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    match config.source_path {
        Some(ref path) => eprintln!("{} Loaded from {}", icons::dim_arrow(), path.display()),
        None => eprintln!(
            "{} No config file found, showing defaults and environment",
            icons::dim_arrow()
        ),
    }
    println!("{}", config.to_json_pretty());
    Ok(())
}

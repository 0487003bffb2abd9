//! Configuration inspection commands.
//!
//! Shows the configuration the engine would run with: the `--config` file, if
//! any, overlaid with `CADENCE__*` environment variables.

use anyhow::{Context, Result};
use cadence_core::config::Config;
use clap::Subcommand;

use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Check that the configuration loads and passes validation
    Validate,
}

pub async fn execute(cmd: ConfigCommands, cfg: &Config, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Show => match format {
            OutputFormat::Table => {
                let content =
                    toml::to_string_pretty(cfg).context("Failed to serialize config")?;
                print!("{}", content);
            }
            _ => output::print_item(cfg, format)?,
        },

        ConfigCommands::Validate => {
            cfg.validate().context("Configuration is invalid")?;

            match format {
                OutputFormat::Table => {
                    output::print_success("Configuration is valid");
                    output::print_summary(
                        "Limits",
                        &[
                            ("Scheduler concurrency", cfg.scheduler.max_concurrency.to_string()),
                            ("History size", cfg.scheduler.history_size.to_string()),
                            ("Remote concurrency", cfg.remote.max_concurrency.to_string()),
                        ],
                    );
                }
                _ => output::print_item(&serde_json::json!({ "valid": true }), format)?,
            }
        }
    }

    Ok(())
}

//! Cadence CLI - run job batches on local or loopback-remote schedulers.
//!
//! Provides job batch execution and configuration inspection.

mod commands;
mod output;

use anyhow::{Context, Result};
use cadence_core::config::Config;
use clap::{Parser, Subcommand};

use commands::{config, job};
use output::OutputFormat;

/// Cadence - Job Scheduling Engine CLI
#[derive(Parser)]
#[command(
    name = "cadence",
    version = "0.1.0",
    about = "Cadence - Job Scheduling Engine",
    long_about = "Run batches of jobs on serial or parallel schedulers and inspect configuration.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "CADENCE_CONFIG")]
    config: Option<String>,

    /// Log filter written to stderr (e.g. debug, cadence_core=trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Job batch operations
    #[command(subcommand)]
    Job(job::JobCommands),

    /// Configuration inspection
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path)),
        None => Config::load().context("Failed to load configuration from environment"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let format = cli.output;
    let result = match load_config(cli.config.as_deref()) {
        Ok(cfg) => match cli.command {
            Commands::Job(cmd) => job::execute(cmd, &cfg, cli.log_level.as_deref(), format).await,
            Commands::Config(cmd) => config::execute(cmd, &cfg, format).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

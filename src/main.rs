use anyhow::{Context, Result};
use clap::Parser;
use kiroboard::commands::Command;
use kiroboard_config::AppConfig;
use std::path::PathBuf;
use std::process::ExitCode;

/// Provision Athena views and QuickSight analytics for Kiro usage reports
#[derive(Parser)]
#[command(name = "kiroboard")]
#[command(version)]
#[command(about = "Provision Athena views and QuickSight analytics for Kiro usage reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })?;

    // CLI flag wins over file and environment
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    kiroboard::init_tracing(&config.logging);
    for warning in config.warnings() {
        tracing::warn!("{}", warning);
    }

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(cli.command.run(&config))
}

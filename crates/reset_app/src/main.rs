//! node-reset - tear down a node that ran the k0s runtime stack.
//!
//! Usage:
//!   node-reset [--data-dir /var/lib/k0s] [--config node-reset.toml] [--debug] [--json]
//!   node-reset --list

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use reset_core::config::{ConfigManager, Settings};
use reset_core::logging::{init_tracing, init_tracing_with_file, LogLevel};
use reset_core::orchestrator::{standard_steps, CleanupConfig};
use reset_core::system::HostCommandRunner;

#[derive(Parser)]
#[command(
    name = "node-reset",
    version = reset_core::version(),
    about = "Remove everything a k0s node left behind on this host"
)]
struct Cli {
    /// k0s data directory (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Settings file; written with defaults if missing
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log every command and step failure
    #[arg(long)]
    debug: bool,
    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
    /// List the steps in execution order and exit
    #[arg(long)]
    list: bool,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the cleanup succeeded.
fn run(cli: Cli) -> Result<bool> {
    let settings = match &cli.config {
        Some(path) => {
            let mut manager = ConfigManager::new(path);
            manager
                .load_or_create()
                .with_context(|| format!("loading {}", path.display()))?;
            manager.into_settings()
        }
        None => Settings::default(),
    };

    let level = if cli.debug {
        LogLevel::Debug
    } else {
        settings.logging.level
    };
    // Keeps the file writer flushing until we return.
    let _guard = if settings.logging.logs_folder.is_empty() {
        init_tracing(level);
        None
    } else {
        init_tracing_with_file(level, &settings.logging.logs_folder)
    };

    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| PathBuf::from(&settings.paths.data_dir));
    let config = CleanupConfig::with_settings(data_dir, settings, Arc::new(HostCommandRunner));
    tracing::debug!("{:?}", config);

    if cli.list {
        for (name, description) in standard_steps(&config).step_descriptions() {
            println!("{:<28} {}", name, description);
        }
        return Ok(true);
    }

    let report = config.cleanup_report();

    if cli.json {
        let summary = serde_json::to_string_pretty(&report.summary())
            .context("serializing run summary")?;
        println!("{}", summary);
    }

    match report.into_result() {
        Ok(report) => {
            tracing::info!(
                "Node reset complete ({} step(s) run, {} skipped)",
                report.executed.len(),
                report.skipped.len()
            );
            Ok(true)
        }
        Err(e) => {
            eprintln!("{}", e);
            Ok(false)
        }
    }
}

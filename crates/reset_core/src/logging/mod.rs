//! Logging infrastructure for node-reset.
//!
//! All logging goes through the `tracing` ecosystem. The orchestrator logs
//! each executed step's name at INFO and each step failure at DEBUG; the
//! command runner logs every external command at DEBUG.
//!
//! # Example
//!
//! ```no_run
//! use reset_core::logging::{init_tracing, LogLevel};
//!
//! init_tracing(LogLevel::Info);
//! tracing::info!("Resetting node");
//! ```

mod types;

pub use types::LogLevel;

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name prefix of the rolling log file.
pub const LOG_FILE_NAME: &str = "node-reset.log";

/// Initialize global tracing subscriber.
///
/// This sets up a subscriber that:
/// - Respects RUST_LOG environment variable
/// - Falls back to the provided default level
/// - Outputs to stderr, leaving stdout for reports
///
/// Should be called once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    tracing_subscriber::registry()
        .with(stderr_layer())
        .with(env_filter(default_level))
        .init();
}

/// Initialize tracing with an additional daily-rolling log file.
///
/// Returns the guard that flushes the file writer; keep it alive until
/// exit. If `logs_dir` can't be created, only stderr logging is set up and
/// `None` is returned.
pub fn init_tracing_with_file(
    default_level: LogLevel,
    logs_dir: impl AsRef<Path>,
) -> Option<WorkerGuard> {
    let logs_dir = logs_dir.as_ref();

    let (file_layer, guard) = match std::fs::create_dir_all(logs_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!(
                "Warning: cannot create log folder {}: {}",
                logs_dir.display(),
                e
            );
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(stderr_layer())
        .with(file_layer)
        .with(env_filter(default_level))
        .init();

    guard
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
}

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()))
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

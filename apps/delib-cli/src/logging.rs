//! Logging initialization.
//!
//! Provides dual-output tracing: stderr (human-readable) and an optional
//! JSON log file under `<data-dir>/.delib/logs/`. File logging is enabled
//! for the export command, whose runs are worth auditing after the fact.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Initialize the tracing subscriber with stderr output.
///
/// When `log_dir` is `Some`, an additional JSON file layer is added that
/// writes to `export_<unix-seconds>.log` inside it.
///
/// Returns an optional [`WorkerGuard`] that must be held for the lifetime of
/// the program so buffered logs are flushed on exit.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the log file
/// cannot be opened.
pub fn init_tracing(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let Some(log_dir) = log_dir else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let (non_blocking, guard) = open_log_writer(log_dir)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::from_default_env()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();

    Ok(Some(guard))
}

/// Create the log directory and file, returning a non-blocking writer and guard.
fn open_log_writer(
    log_dir: &Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory: {}", log_dir.display()))?;

    let log_path = build_log_path(log_dir);
    let log_file = fs::File::create(&log_path)
        .with_context(|| format!("failed to create log file: {}", log_path.display()))?;

    Ok(tracing_appender::non_blocking(log_file))
}

/// Build the log file path: `<log_dir>/export_<unix-seconds>.log`.
fn build_log_path(log_dir: &Path) -> PathBuf {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    log_dir.join(format!("export_{secs}.log"))
}

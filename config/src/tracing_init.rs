//! Tracing setup shared by binaries: `RUST_LOG` filter, output to `LOG_FILE` or stderr.
//!
//! Logs never go to stdout, so a CLI can print the reply (or JSON) there untouched.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Env key for the log file path.
pub const ENV_LOG_FILE: &str = "LOG_FILE";

#[derive(Debug, thiserror::Error)]
pub enum TracingInitError {
    #[error("invalid LOG_FILE path: {0}")]
    InvalidLogFile(String),
    #[error("tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Installs the global subscriber.
///
/// - **RUST_LOG**: filter, e.g. `toolgraph=debug`. Defaults to `default_filter`.
/// - **LOG_FILE**: when set, logs are appended to this file (no ANSI) through a
///   non-blocking writer; otherwise they go to stderr.
///
/// Keep the returned guard alive until exit so buffered file logs are flushed.
pub fn init(default_filter: &str) -> Result<Option<WorkerGuard>, TracingInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match std::env::var(ENV_LOG_FILE) {
        Ok(path) if !path.is_empty() => {
            let (dir, file) = split_log_path(Path::new(&path))?;
            let appender = tracing_appender::rolling::never(dir, file);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).try_init()?;
            tracing::info!(path = %path, "logging to file");
            Ok(Some(guard))
        }
        _ => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).try_init()?;
            Ok(None)
        }
    }
}

fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr), TracingInitError> {
    let file = path
        .file_name()
        .ok_or_else(|| TracingInitError::InvalidLogFile(path.display().to_string()))?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    Ok((dir, file))
}

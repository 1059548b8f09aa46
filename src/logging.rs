//! Process-wide logging.
//!
//! [`init_logging`] is called once before a run. Records go to stderr and,
//! when a log file is configured, are also appended to that file. The file
//! is written from a background worker; keep the returned [`LogGuard`] alive
//! for the whole run and drop it afterwards to flush it.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::LoggingError;

#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    pub verbose: bool,
    pub log_file: Option<PathBuf>,
}

/// Flushes the log file when dropped.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

pub fn init_logging(settings: &LogSettings) -> Result<LogGuard, LoggingError> {
    // RUST_LOG takes precedence over --verbose.
    let default_level = if settings.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match &settings.log_file {
        Some(path) => {
            let appender = file_appender(path)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(ErrorLayer::default())
        .try_init()?;

    Ok(LogGuard { _file: guard })
}

// A single file that is appended to across runs.
fn file_appender(path: &Path) -> Result<RollingFileAppender, LoggingError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| crate::config::DEFAULT_LOG_FILE.to_string());

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .map_err(|source| LoggingError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}

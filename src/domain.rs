use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use polars::error::PolarsError;
use thiserror::Error;

/// Underlying cause of a failed read or write.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("{0}")]
    IoError(#[from] io::Error),
    #[error("{0}")]
    PolarsError(#[from] PolarsError),
    #[error("{0}")]
    ExcelReadError(#[from] calamine::Error),
    #[error("{0}")]
    ExcelWriteError(#[from] rust_xlsxwriter::XlsxError),
    #[error("could not move temporary file into place: {0}")]
    PersistError(#[from] tempfile::PersistError),
    #[error("file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("not a regular file")]
    NotAFile,
    #[error("workbook has no worksheets")]
    EmptyWorkbook,
}

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("unsupported file format '{extension}' for {}", .path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("failed to extract {}: {source}", .path.display())]
    Extraction {
        path: PathBuf,
        #[source]
        source: DataError,
    },

    #[error("failed to transform table: {reason}")]
    Transformation {
        reason: String,
        #[source]
        source: Option<PolarsError>,
    },

    #[error("failed to load {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: DataError,
    },
}

impl EtlError {
    pub fn unsupported(path: &Path) -> Self {
        let extension = path
            .extension()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        EtlError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        }
    }

    pub fn extraction(path: &Path, source: impl Into<DataError>) -> Self {
        EtlError::Extraction {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    pub fn load(path: &Path, source: impl Into<DataError>) -> Self {
        EtlError::Load {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    pub fn transformation(reason: impl Into<String>) -> Self {
        EtlError::Transformation {
            reason: reason.into(),
            source: None,
        }
    }
}

impl From<PolarsError> for EtlError {
    // Polars errors only surface unannotated from the transform step;
    // extract and load wrap theirs with the path.
    fn from(err: PolarsError) -> Self {
        EtlError::Transformation {
            reason: "unexpected table structure".into(),
            source: Some(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Transform,
    Load,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Extract => write!(f, "extract"),
            Stage::Transform => write!(f, "transform"),
            Stage::Load => write!(f, "load"),
        }
    }
}

/// A failed pipeline run, tagged with the stage that stopped it.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub source: EtlError,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not expand path '{path}': {source}")]
    Expand {
        path: String,
        #[source]
        source: shellexpand::LookupError<std::env::VarError>,
    },
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("could not open log file {}: {source}", .path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: tracing_appender::rolling::InitError,
    },

    #[error("logging is already initialized: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_reports_extension() {
        let err = EtlError::unsupported(Path::new("data/input.txt"));
        match &err {
            EtlError::UnsupportedFormat { extension, .. } => assert_eq!(extension, "txt"),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "unsupported file format 'txt' for data/input.txt"
        );
    }

    #[test]
    fn stage_failure_names_stage() {
        let failure = StageFailure {
            stage: Stage::Extract,
            source: EtlError::extraction(Path::new("missing.csv"), DataError::FileNotFound),
        };
        assert_eq!(
            failure.to_string(),
            "extract stage failed: failed to extract missing.csv: file not found"
        );
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use derive_setters::Setters;
use serde::Deserialize;

use crate::domain::ConfigError;

pub const DEFAULT_SOURCE_PATH: &str = "data/source/my_data.csv";
pub const DEFAULT_DESTINATION_PATH: &str = "data/destination/processed_data.csv";
pub const DEFAULT_LOG_FILE: &str = "etl_pipeline.log";

/// Paths for one pipeline run.
///
/// Read from a TOML file where every key is optional:
///
/// ```toml
/// source_path = "~/exports/people.xlsx"
/// destination_path = "out/people.json"
/// log_file = "logs/etl.log"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Setters)]
#[serde(default, deny_unknown_fields)]
#[setters(into)]
pub struct PipelineConfig {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    /// `None` logs to the console only.
    pub log_file: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from(DEFAULT_SOURCE_PATH),
            destination_path: PathBuf::from(DEFAULT_DESTINATION_PATH),
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw, path)
    }

    fn from_toml(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Expands `~` and `$VAR` references in every configured path.
    pub fn expanded(self) -> Result<Self, ConfigError> {
        Ok(Self {
            source_path: expand(&self.source_path)?,
            destination_path: expand(&self.destination_path)?,
            log_file: self.log_file.as_deref().map(expand).transpose()?,
        })
    }
}

fn expand(path: &Path) -> Result<PathBuf, ConfigError> {
    let raw = path.to_string_lossy();
    shellexpand::full(&raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|source| ConfigError::Expand {
            path: raw.to_string(),
            source,
        })
}

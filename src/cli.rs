use std::path::PathBuf;

use clap::Parser;

use crate::config::PipelineConfig;
use crate::domain::ConfigError;
use crate::logging::LogSettings;

/// Normalize a tabular file (csv, json, xlsx) into a new file.
#[derive(Parser, Debug)]
#[command(name = "etl-pipeline", version, about)]
pub struct Cli {
    /// TOML file with source_path, destination_path and log_file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// File to read; the extension selects the format
    #[arg(short, long, value_name = "FILE")]
    pub source: Option<PathBuf>,

    /// File to write; the extension selects the format
    #[arg(short, long, value_name = "FILE")]
    pub destination: Option<PathBuf>,

    /// Also append log records to this file
    #[arg(long, value_name = "FILE", conflicts_with = "no_log_file")]
    pub log_file: Option<PathBuf>,

    /// Log to the console only
    #[arg(long)]
    pub no_log_file: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Flags override the config file, which overrides the defaults.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        let mut cfg = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(source) = &self.source {
            cfg.source_path = source.clone();
        }
        if let Some(destination) = &self.destination {
            cfg.destination_path = destination.clone();
        }
        if let Some(log_file) = &self.log_file {
            cfg.log_file = Some(log_file.clone());
        }
        if self.no_log_file {
            cfg.log_file = None;
        }
        cfg.expanded()
    }

    pub fn log_settings(&self, cfg: &PipelineConfig) -> LogSettings {
        LogSettings {
            verbose: self.verbose,
            log_file: cfg.log_file.clone(),
        }
    }
}

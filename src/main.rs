use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;

use etl_pipeline::cli::Cli;
use etl_pipeline::domain::{ConfigError, LoggingError};
use etl_pipeline::logging::init_logging;
use etl_pipeline::{Controller, RunSummary, StageFailure};

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Pipeline(#[from] StageFailure),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Err(e) => {
            eprintln!("ETL process failed: {e}");
            ExitCode::FAILURE
        }
        Ok(summary) => {
            println!(
                "ETL process completed successfully. {} of {} records written to {}",
                summary.records_loaded,
                summary.records_extracted,
                summary.destination.display()
            );
            ExitCode::SUCCESS
        }
    }
}

fn run(cli: &Cli) -> Result<RunSummary, AppError> {
    let cfg = cli.pipeline_config()?;
    let guard = init_logging(&cli.log_settings(&cfg))?;

    let result = Controller::new(&cfg).run();

    drop(guard);
    Ok(result?)
}

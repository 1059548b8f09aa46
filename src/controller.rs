use std::path::PathBuf;

use tracing::{error, info, info_span};

use crate::config::PipelineConfig;
use crate::domain::{EtlError, Stage, StageFailure};
use crate::extractor::Extractor;
use crate::loader::Loader;
use crate::transformer::Transformer;

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub records_extracted: usize,
    pub records_loaded: usize,
    pub destination: PathBuf,
}

/// Runs extract, transform and load once, in that order.
///
/// The first failing stage ends the run. Its error is logged with the stage
/// name and returned; later stages are never invoked.
pub struct Controller {
    extractor: Extractor,
    transformer: Transformer,
    loader: Loader,
}

impl Controller {
    pub fn new(cfg: &PipelineConfig) -> Self {
        info!(
            "ETL Pipeline initialized: {} -> {}",
            cfg.source_path.display(),
            cfg.destination_path.display()
        );
        Self {
            extractor: Extractor::new(&cfg.source_path),
            transformer: Transformer::new(),
            loader: Loader::new(&cfg.destination_path),
        }
    }

    pub fn with_transformer(mut self, transformer: Transformer) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn run(&self) -> Result<RunSummary, StageFailure> {
        info!("Starting ETL pipeline");
        let result = self.run_stages();
        match &result {
            Ok(_) => info!("ETL pipeline completed successfully"),
            Err(e) => error!("ETL pipeline failed: {e}"),
        }
        result
    }

    fn run_stages(&self) -> Result<RunSummary, StageFailure> {
        let raw = Self::stage(Stage::Extract, || self.extractor.extract())?;
        let records_extracted = raw.height();

        let transformed = Self::stage(Stage::Transform, || self.transformer.transform(raw))?;

        Self::stage(Stage::Load, || self.loader.load(&transformed))?;

        Ok(RunSummary {
            records_extracted,
            records_loaded: transformed.height(),
            destination: self.loader.path().to_path_buf(),
        })
    }

    fn stage<T>(
        stage: Stage,
        f: impl FnOnce() -> Result<T, EtlError>,
    ) -> Result<T, StageFailure> {
        let span = info_span!("stage", name = %stage);
        let _enter = span.enter();
        f().map_err(|source| {
            error!("Error during {stage}: {source}");
            StageFailure { stage, source }
        })
    }
}

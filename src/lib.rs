//! Single-pass batch ETL over tabular files.
//!
//! A run reads one source file into a [`Table`], cleans it with the
//! [`Transformer`] and writes it to a destination file. The file extension
//! picks the format on both ends (see [`format::REGISTRY`]).
//!
//! ```no_run
//! use etl_pipeline::{Controller, PipelineConfig};
//!
//! let cfg = PipelineConfig::default()
//!     .source_path("data/source/people.csv")
//!     .destination_path("data/destination/people.json");
//! let summary = Controller::new(&cfg).run()?;
//! println!("wrote {} records", summary.records_loaded);
//! # Ok::<(), etl_pipeline::StageFailure>(())
//! ```

pub mod cli;
pub mod config;
pub mod controller;
pub mod domain;
mod excel;
pub mod extractor;
pub mod format;
pub mod loader;
pub mod logging;
pub mod table;
pub mod transformer;

pub use config::PipelineConfig;
pub use controller::{Controller, RunSummary};
pub use domain::{DataError, EtlError, Stage, StageFailure};
pub use extractor::Extractor;
pub use loader::Loader;
pub use table::Table;
pub use transformer::Transformer;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use crate::domain::{DataError, EtlError};
use crate::format::FileType;
use crate::table::Table;

/// Reads the source file of a run into a [`Table`].
#[derive(Debug, Clone)]
pub struct Extractor {
    path: PathBuf,
}

impl Extractor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the whole file or nothing. The format is resolved before the
    /// file is touched, so an unknown extension never reports a missing file.
    pub fn extract(&self) -> Result<Table, EtlError> {
        info!("Extracting data from {}", self.path.display());

        let read = FileType::reader_for(&self.path)?;
        Self::check_file(&self.path)?;

        let start_time = Instant::now();
        let frame = read(&self.path).map_err(|e| EtlError::extraction(&self.path, e))?;
        debug!(
            "Reading {} took {}ms",
            self.path.display(),
            start_time.elapsed().as_millis()
        );

        let table = Table::new(frame);
        for name in table.column_names() {
            debug!("Column: {name}");
        }
        info!("Successfully extracted {} records", table.height());
        Ok(table)
    }

    fn check_file(path: &Path) -> Result<(), EtlError> {
        let metadata = fs::metadata(path).map_err(|e| {
            let cause = match e.kind() {
                ErrorKind::NotFound => DataError::FileNotFound,
                ErrorKind::PermissionDenied => DataError::PermissionDenied,
                _ => DataError::IoError(e),
            };
            EtlError::extraction(path, cause)
        })?;
        if !metadata.is_file() {
            return Err(EtlError::extraction(path, DataError::NotAFile));
        }
        Ok(())
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::domain::EtlError;
use crate::format::FileType;
use crate::table::Table;

/// Writes the result of a run to its destination file.
///
/// The table is serialized into a temporary file next to the destination and
/// then renamed over it, so readers see either the previous file or the
/// complete new one. Nothing is created when the extension is unsupported.
/// The written file keeps the permissions of the file it replaces, or gets
/// 0644 on Unix when the destination is new.
#[derive(Debug, Clone)]
pub struct Loader {
    path: PathBuf,
}

impl Loader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self, table: &Table) -> Result<(), EtlError> {
        info!("Loading data to {}", self.path.display());

        let write = FileType::writer_for(&self.path)?;
        let dir = self.target_dir();
        fs::create_dir_all(dir).map_err(|e| EtlError::load(&self.path, e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| EtlError::load(&self.path, e))?;
        debug!("Writing to temporary file {}", tmp.path().display());

        let mut frame = table.frame().clone();
        write(&mut frame, tmp.as_file_mut()).map_err(|e| EtlError::load(&self.path, e))?;
        if let Some(permissions) = self.output_permissions() {
            tmp.as_file()
                .set_permissions(permissions)
                .map_err(|e| EtlError::load(&self.path, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| EtlError::load(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| EtlError::load(&self.path, e))?;

        info!(
            "Successfully loaded {} records to {}",
            table.height(),
            self.path.display()
        );
        Ok(())
    }

    // Temp files are created owner-only.
    fn output_permissions(&self) -> Option<fs::Permissions> {
        match fs::metadata(&self.path) {
            Ok(metadata) => Some(metadata.permissions()),
            Err(_) => default_permissions(),
        }
    }

    fn target_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

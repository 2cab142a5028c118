use std::path::{Path, PathBuf};

use crate::error::StorageError;

use super::{ensure_directory, plain_file_name};

/// Scratch directory for reports that arrive as bytes rather than files.
#[derive(Debug, Clone)]
pub struct StagingArea {
    directory: PathBuf,
}

impl StagingArea {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    /// Writes `content` as `file_name` and returns its path.
    pub fn write(&self, file_name: &str, content: &[u8]) -> Result<PathBuf, StorageError> {
        let file_name = plain_file_name(Path::new(file_name))?;
        ensure_directory(&self.directory)?;

        let path = self.directory.join(file_name);
        std::fs::write(&path, content).map_err(|e| StorageError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }
}

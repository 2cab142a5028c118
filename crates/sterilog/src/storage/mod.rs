pub mod archive;
pub mod staging;

pub use archive::ReportArchive;
pub use staging::StagingArea;

use std::path::{Path, PathBuf};

use crate::error::StorageError;

pub(crate) fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// Returns the final component of `name`, refusing anything that would
/// escape the target directory.
pub(crate) fn plain_file_name(name: &Path) -> Result<String, StorageError> {
    match (name.file_name().and_then(|n| n.to_str()), name.components().count()) {
        (Some(file_name), 1) => Ok(file_name.to_string()),
        _ => Err(StorageError::InvalidFileName(PathBuf::from(name))),
    }
}

use std::path::{Path, PathBuf};

use crate::error::StorageError;

use super::ensure_directory;

/// Stable copies of imported source reports.
///
/// Copies live at `<directory>/<autoclave_id>/<cycle_number>/<file_name>`,
/// so exports that reuse a file name never share a copy. Re-archiving the
/// same cycle replaces its earlier copy.
#[derive(Debug, Clone)]
pub struct ReportArchive {
    directory: PathBuf,
}

impl ReportArchive {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Folder holding the copies for one cycle.
    pub fn cycle_directory(&self, autoclave_id: i64, cycle_number: i64) -> PathBuf {
        self.directory
            .join(autoclave_id.to_string())
            .join(cycle_number.to_string())
    }

    /// Copies `source` into the cycle's archive folder and returns the
    /// copy's path.
    pub fn archive(
        &self,
        source: &Path,
        autoclave_id: i64,
        cycle_number: i64,
    ) -> Result<PathBuf, StorageError> {
        let file_name = source
            .file_name()
            .ok_or_else(|| StorageError::InvalidFileName(source.to_path_buf()))?;

        let directory = self.cycle_directory(autoclave_id, cycle_number);
        ensure_directory(&directory)?;
        let target = directory.join(file_name);

        if is_same_file(source, &target) {
            return Ok(target);
        }

        std::fs::copy(source, &target).map_err(|e| StorageError::CopyFile {
            from: source.to_path_buf(),
            to: target.clone(),
            source: e,
        })?;

        log::debug!("Archived report {} to {}", source.display(), target.display());
        Ok(target)
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

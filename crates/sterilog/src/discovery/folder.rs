use std::path::Path;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::DiscoveryError;
use crate::import::{ImportOrchestrator, ImportOutcome};

/// Result of importing one file found during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub file: String,
    pub result: Result<ImportOutcome, String>,
}

impl Serialize for FileOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("file", &self.file)?;
        match &self.result {
            Ok(ImportOutcome::Imported {
                cycle_id,
                status,
                cycle_type,
            }) => {
                map.serialize_entry("imported", &true)?;
                map.serialize_entry("cycle_id", cycle_id)?;
                map.serialize_entry("status", status)?;
                map.serialize_entry("cycle_type", cycle_type)?;
            }
            Ok(ImportOutcome::Skipped { cycle_id }) => {
                map.serialize_entry("skipped", &true)?;
                map.serialize_entry("cycle_id", cycle_id)?;
            }
            Err(message) => map.serialize_entry("error", message)?,
        }
        map.end()
    }
}

/// Autoclave exports are `.txt` files. macOS resource forks (`._name`)
/// share the extension and are ignored.
pub(crate) fn is_report_file(name: &str) -> bool {
    name.to_lowercase().ends_with(".txt") && !name.starts_with("._")
}

/// Imports every report directly inside `folder`, in file name order.
///
/// A file that fails to import is recorded with its error and the scan
/// moves on to the next one.
pub(crate) fn scan(
    importer: &ImportOrchestrator,
    folder: &Path,
) -> Result<Vec<FileOutcome>, DiscoveryError> {
    if !folder.is_dir() {
        return Err(DiscoveryError::FolderMissing(folder.to_path_buf()));
    }

    let mut outcomes = Vec::new();

    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1) // Reports sit at the top level of the export folder
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(DiscoveryError::ScanFailed {
                    path: folder.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        let file = entry.file_name().to_string_lossy().into_owned();
        if !is_report_file(&file) {
            debug!(file = %file, "Not a report file");
            continue;
        }

        let result = importer.import_file(path).map_err(|e| {
            warn!(file = %file, error = %e, "Report import failed");
            e.to_string()
        });
        outcomes.push(FileOutcome { file, result });
    }

    info!(
        files = outcomes.len(),
        imported = outcomes
            .iter()
            .filter(|o| matches!(&o.result, Ok(outcome) if outcome.is_imported()))
            .count(),
        "Folder scan finished"
    );
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_report_file() {
        assert!(is_report_file("cycle_100.txt"));
        assert!(is_report_file("CYCLE_100.TXT"));
        assert!(!is_report_file("._cycle_100.txt"));
        assert!(!is_report_file("cycle_100.csv"));
        assert!(!is_report_file("txt"));
    }

    #[test]
    fn test_file_outcome_serialization() {
        let imported = FileOutcome {
            file: "a.txt".to_string(),
            result: Ok(ImportOutcome::Skipped { cycle_id: 4 }),
        };
        assert_eq!(
            serde_json::to_value(&imported).unwrap(),
            serde_json::json!({"file": "a.txt", "skipped": true, "cycle_id": 4})
        );

        let failed = FileOutcome {
            file: "b.txt".to_string(),
            result: Err("Unknown autoclave".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({"file": "b.txt", "error": "Unknown autoclave"})
        );
    }
}

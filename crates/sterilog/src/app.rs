//! Wires the import pipeline and cycle workflow from a [`Config`].

use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::discovery::{
    FileOutcome, LsblkEnumerator, SourceDiscovery, VolumeEnumerator, VolumeScanResult,
};
use crate::error::Result;
use crate::import::{ImportOrchestrator, ImportOutcome};
use crate::lifecycle::{ApprovalResult, CycleLifecycle, CycleStatus};
use crate::report::{PdfReportGenerator, ReportGenerator};
use crate::storage::{ReportArchive, StagingArea};

/// One handle over the database, importer, lifecycle and discovery.
///
/// Cloning is cheap; every component shares the same database handle.
#[derive(Clone)]
pub struct Sterilog {
    config: Arc<Config>,
    db: Database,
    importer: ImportOrchestrator,
    lifecycle: CycleLifecycle,
    discovery: SourceDiscovery,
}

impl Sterilog {
    /// Opens the configured database (running migrations) and builds every
    /// component with its default collaborator.
    pub fn open(config: Config) -> Result<Self> {
        let db = Database::open(&config.database_path)?;
        let reports = PdfReportGenerator::new(&config.storage.generated_directory);
        Ok(Self::with_parts(
            config,
            db,
            Arc::new(reports),
            Arc::new(LsblkEnumerator),
        ))
    }

    /// Builds the facade around caller-supplied collaborators.
    pub fn with_parts(
        config: Config,
        db: Database,
        reports: Arc<dyn ReportGenerator>,
        volumes: Arc<dyn VolumeEnumerator>,
    ) -> Self {
        let importer = ImportOrchestrator::new(
            db.clone(),
            ReportArchive::new(&config.storage.reports_directory),
            StagingArea::new(&config.storage.staging_directory),
        );
        let lifecycle = CycleLifecycle::new(db.clone(), reports);
        let discovery =
            SourceDiscovery::new(importer.clone(), volumes, config.removable_media.enabled);

        Self {
            config: Arc::new(config),
            db,
            importer,
            lifecycle,
            discovery,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn importer(&self) -> &ImportOrchestrator {
        &self.importer
    }

    /// Field edits, client changes, queries and deletion.
    pub fn lifecycle(&self) -> &CycleLifecycle {
        &self.lifecycle
    }

    pub fn discovery(&self) -> &SourceDiscovery {
        &self.discovery
    }

    pub fn import_report(&self, path: &Path) -> Result<ImportOutcome> {
        Ok(self.importer.import_file(path)?)
    }

    /// Imports a report delivered as bytes, e.g. uploaded by a remote agent.
    pub fn import_report_bytes(&self, file_name: &str, bytes: &[u8]) -> Result<ImportOutcome> {
        Ok(self.importer.import_bytes(file_name, bytes)?)
    }

    pub fn scan_folder(&self, folder: &Path) -> Result<Vec<FileOutcome>> {
        Ok(self.discovery.scan_folder(folder)?)
    }

    pub fn scan_removable_media(&self) -> Vec<VolumeScanResult> {
        self.discovery.scan_removable_media()
    }

    pub fn recompute_readiness(&self, cycle_id: i64) -> Result<CycleStatus> {
        Ok(self.lifecycle.recompute_readiness(cycle_id)?)
    }

    pub fn approve(&self, cycle_id: i64) -> Result<ApprovalResult> {
        Ok(self.lifecycle.approve(cycle_id)?)
    }

    pub fn reject(&self, cycle_id: i64, reason: Option<&str>) -> Result<()> {
        Ok(self.lifecycle.reject(cycle_id, reason)?)
    }

    pub fn revert_to_ready(&self, cycle_id: i64) -> Result<()> {
        Ok(self.lifecycle.revert_to_ready(cycle_id)?)
    }

    pub fn mark_documented(&self, cycle_id: i64) -> Result<()> {
        Ok(self.lifecycle.mark_documented(cycle_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SterilogError;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_database() {
        let dir = TempDir::new().unwrap();
        let app = Sterilog::open(Config::with_root(dir.path())).unwrap();

        assert!(dir.path().join("data").join("sterilog.db").exists());
        assert!(app.scan_removable_media().is_empty());
    }

    #[test]
    fn test_errors_are_wrapped() {
        let dir = TempDir::new().unwrap();
        let app = Sterilog::open(Config::with_root(dir.path())).unwrap();

        assert!(matches!(app.approve(1), Err(SterilogError::Lifecycle(_))));
        assert!(matches!(
            app.scan_folder(&dir.path().join("missing")),
            Err(SterilogError::Discovery(_))
        ));
        assert!(matches!(
            app.import_report(&dir.path().join("missing.txt")),
            Err(SterilogError::Import(_))
        ));
    }
}

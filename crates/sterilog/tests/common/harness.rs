//! Test harness for isolated test execution.
//!
//! Every harness owns a temp directory holding the database, the report
//! archive, the staging area and generated reports.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use sterilog::config::Config;
use sterilog::db::{autoclave_repo, cycle_repo, import_repo, Database};
use sterilog::discovery::{RemovableVolume, VolumeEnumerator};
use sterilog::{DiscoveryError, PdfReportGenerator, Sterilog};

use super::ReportBuilder;

pub const SERIAL: &str = "SN12345678";

/// Serves a fixed list of volumes.
pub struct StaticVolumes(pub Vec<RemovableVolume>);

impl VolumeEnumerator for StaticVolumes {
    fn volumes(&self) -> Result<Vec<RemovableVolume>, DiscoveryError> {
        Ok(self.0.clone())
    }
}

/// Always fails, like a host without `lsblk`.
pub struct BrokenVolumes;

impl VolumeEnumerator for BrokenVolumes {
    fn volumes(&self) -> Result<Vec<RemovableVolume>, DiscoveryError> {
        Err(DiscoveryError::Enumeration("lsblk: not found".to_string()))
    }
}

pub struct TestHarness {
    temp_dir: TempDir,
    pub config: Config,
    pub app: Sterilog,
    pub input_dir: PathBuf,
}

impl TestHarness {
    /// Harness with removable scanning disabled and one autoclave
    /// registered under [`SERIAL`].
    pub fn new() -> Self {
        Self::build(false, Arc::new(StaticVolumes(Vec::new())))
    }

    /// Harness with removable scanning enabled, backed by `volumes`.
    pub fn with_volumes(volumes: Arc<dyn VolumeEnumerator>) -> Self {
        Self::build(true, volumes)
    }

    fn build(removable: bool, volumes: Arc<dyn VolumeEnumerator>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut config = Config::with_root(temp_dir.path());
        config.removable_media.enabled = removable;

        let input_dir = temp_dir.path().join("input");
        std::fs::create_dir_all(&input_dir).expect("Failed to create input dir");

        let db = Database::open(&config.database_path).expect("Failed to open database");
        let reports = PdfReportGenerator::new(&config.storage.generated_directory);
        let app = Sterilog::with_parts(config.clone(), db, Arc::new(reports), volumes);

        let harness = Self {
            temp_dir,
            config,
            app,
            input_dir,
        };
        harness.register_autoclave("Autoklaw 1", SERIAL, None);
        harness
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn register_autoclave(&self, name: &str, serial: &str, volume: Option<&str>) -> i64 {
        self.app
            .database()
            .with_conn(|conn| autoclave_repo::insert(conn, name, serial, volume, true))
            .expect("Failed to register autoclave")
    }

    /// Write raw bytes to the input directory.
    pub fn write_input(&self, filename: &str, content: &[u8]) -> PathBuf {
        let path = self.input_dir.join(filename);
        std::fs::write(&path, content).expect("Failed to write input file");
        path
    }

    pub fn write_report(&self, filename: &str, report: &ReportBuilder) -> PathBuf {
        self.write_input(filename, &report.build())
    }

    pub fn cycle_count(&self) -> u64 {
        self.app
            .database()
            .with_conn(cycle_repo::count)
            .expect("Failed to count cycles")
    }

    pub fn ledger_count(&self) -> u64 {
        self.app
            .database()
            .with_conn(import_repo::count)
            .expect("Failed to count imports")
    }

    pub fn archive_dir(&self) -> &Path {
        &self.config.storage.reports_directory
    }

    pub fn staging_dir(&self) -> &Path {
        &self.config.storage.staging_directory
    }
}

use std::path::Path;

use chrono::Utc;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{info, info_span, warn};

use super::error::ImportError;
use super::hash::content_hash;
use crate::db::cycle_repo::{self, NewCycle};
use crate::db::{autoclave_repo, import_repo, Database};
use crate::decoder::{decode_report, DecodedReport};
use crate::lifecycle::{CycleStatus, CycleTransition, CycleType};
use crate::sanitize;
use crate::storage::{ReportArchive, StagingArea};
use crate::validation::{validate, Strictness};

/// Result of importing one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// A new cycle row was created.
    Imported {
        cycle_id: i64,
        status: CycleStatus,
        cycle_type: CycleType,
    },
    /// The cycle already exists; nothing was written.
    Skipped { cycle_id: i64 },
}

impl ImportOutcome {
    pub fn is_imported(&self) -> bool {
        matches!(self, Self::Imported { .. })
    }

    pub fn cycle_id(&self) -> i64 {
        match self {
            Self::Imported { cycle_id, .. } | Self::Skipped { cycle_id } => *cycle_id,
        }
    }
}

impl Serialize for ImportOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Self::Imported {
                cycle_id,
                status,
                cycle_type,
            } => {
                map.serialize_entry("imported", &true)?;
                map.serialize_entry("cycle_id", cycle_id)?;
                map.serialize_entry("status", status)?;
                map.serialize_entry("cycle_type", cycle_type)?;
            }
            Self::Skipped { cycle_id } => {
                map.serialize_entry("skipped", &true)?;
                map.serialize_entry("cycle_id", cycle_id)?;
            }
        }
        map.end()
    }
}

/// Entry point for importing one report file.
#[derive(Clone)]
pub struct ImportOrchestrator {
    db: Database,
    archive: ReportArchive,
    staging: StagingArea,
}

impl ImportOrchestrator {
    pub fn new(db: Database, archive: ReportArchive, staging: StagingArea) -> Self {
        Self {
            db,
            archive,
            staging,
        }
    }

    /// Imports the report at `path`.
    ///
    /// Re-delivering a report whose cycle is already stored yields
    /// [`ImportOutcome::Skipped`]. Decode failures and unknown autoclaves
    /// are returned as errors.
    pub fn import_file(&self, path: &Path) -> Result<ImportOutcome, ImportError> {
        let filename = sanitize::redact_path(path);
        let _span = info_span!("import_report", filename = %filename).entered();

        let bytes = std::fs::read(path).map_err(|e| ImportError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let hash = content_hash(&bytes);
        let ledger = self
            .db
            .with_conn(|conn| import_repo::find_by_hash(conn, &hash))?;

        let decoded = decode_report(&bytes)?;

        let autoclave = self
            .db
            .with_conn(|conn| {
                autoclave_repo::find_active_by_serial_prefix(conn, &decoded.serial_number)
            })?
            .ok_or_else(|| ImportError::UnregisteredAutoclave {
                serial: decoded.serial_number.clone(),
            })?;

        let existing = self.db.with_conn(|conn| {
            cycle_repo::find_by_number(conn, autoclave.id, decoded.cycle_number)
        })?;
        if let Some(existing) = existing {
            info!(
                cycle_id = existing.id,
                cycle_number = decoded.cycle_number,
                known_hash = ledger.is_some(),
                "Report skipped, cycle already imported"
            );
            return Ok(ImportOutcome::Skipped {
                cycle_id: existing.id,
            });
        }
        if let Some(previous) = &ledger {
            info!(
                cycle_number = decoded.cycle_number,
                previous_file = %previous.file_name,
                "Known report without a stored cycle, importing again"
            );
        }

        let archived = self
            .archive
            .archive(path, autoclave.id, decoded.cycle_number)?;
        let archived_path = archived.to_string_lossy().into_owned();

        let outcome = self.db.with_tx(|tx| -> Result<ImportOutcome, ImportError> {
            let now = Utc::now();
            let cycle_id = cycle_repo::insert(
                tx,
                &new_cycle(autoclave.id, &decoded, &archived_path),
                now,
            )?;

            let mut status = CycleStatus::Imported;
            let mut cycle_type = decoded.cycle_type;
            let report = validate(&decoded.threshold_input(), Strictness::Strict);
            if !report.is_valid() {
                // Fresh rows are always IMPORTED, so this cannot conflict.
                if let Ok(rejected) = status.apply(CycleTransition::AutoReject) {
                    status = rejected;
                    cycle_type = CycleType::Rejected;
                    cycle_repo::set_status_and_type(tx, cycle_id, status, cycle_type, now)?;
                    warn!(
                        cycle_id,
                        cycle_number = decoded.cycle_number,
                        reasons = %report,
                        "Imported cycle failed thresholds, rejected"
                    );
                }
            }

            import_repo::record(tx, autoclave.id, &filename, &archived_path, &hash, now)?;

            Ok(ImportOutcome::Imported {
                cycle_id,
                status,
                cycle_type,
            })
        })?;

        info!(
            autoclave_id = autoclave.id,
            cycle_number = decoded.cycle_number,
            "Report imported"
        );
        Ok(outcome)
    }

    /// Imports a report delivered as bytes, e.g. by a remote collection
    /// agent. The bytes are written to the staging directory first.
    pub fn import_bytes(&self, file_name: &str, bytes: &[u8]) -> Result<ImportOutcome, ImportError> {
        let staged = self.staging.write(file_name, bytes)?;
        self.import_file(&staged)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn new_cycle(autoclave_id: i64, decoded: &DecodedReport, report_file_path: &str) -> NewCycle {
    NewCycle {
        autoclave_id,
        cycle_number: decoded.cycle_number,
        cycle_start_datetime: decoded.cycle_start_datetime,
        program: decoded.program.clone(),
        sterilization_start: decoded.sterilization_start,
        sterilization_end: decoded.sterilization_end,
        sterilization_duration_seconds: decoded.sterilization_duration_seconds,
        pressure_min: decoded.pressure_min,
        pressure_max: decoded.pressure_max,
        temperature_min: decoded.temperature_min,
        temperature_max: decoded.temperature_max,
        cycle_type: decoded.cycle_type,
        status: CycleStatus::Imported,
        report_file_path: Some(report_file_path.to_string()),
    }
}

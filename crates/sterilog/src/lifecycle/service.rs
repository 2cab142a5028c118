use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, info_span, warn};

use super::client::ClientRef;
use super::error::LifecycleError;
use super::state::{CycleStatus, CycleTransition, CycleType, LogAction, StateConflict};
use crate::db::cycle_repo::{self, CycleFieldUpdate, CycleFilter, CycleRow, CycleSummary};
use crate::db::log_repo::{self, CycleLogRow};
use crate::db::{client_repo, Database};
use crate::report::ReportGenerator;
use crate::validation::{is_bowie_dick_program, validate, Strictness};

/// Returned by a successful [`CycleLifecycle::approve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalResult {
    pub cycle_id: i64,
    pub approved: bool,
    pub report_url: String,
    pub report_path: PathBuf,
}

/// A cycle with its clients and audit trail (newest entry first).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleDetails {
    pub cycle: CycleRow,
    pub clients: Vec<ClientRef>,
    pub logs: Vec<CycleLogRow>,
}

/// Status transitions, client membership and manual corrections for
/// stored cycles.
#[derive(Clone)]
pub struct CycleLifecycle {
    db: Database,
    reports: Arc<dyn ReportGenerator>,
}

impl CycleLifecycle {
    pub fn new(db: Database, reports: Arc<dyn ReportGenerator>) -> Self {
        Self { db, reports }
    }

    /// Re-evaluates whether an unsettled cycle is ready for approval.
    ///
    /// Settled cycles (approved, rejected, documented) are returned as is.
    /// Otherwise the cycle becomes `READY` when it has at least one client
    /// and passes the coarse threshold check, and `IMPORTED` when not.
    pub fn recompute_readiness(&self, cycle_id: i64) -> Result<CycleStatus, LifecycleError> {
        self.db.with_tx(|tx| -> Result<CycleStatus, LifecycleError> {
            let cycle = load(tx, cycle_id)?;
            recompute(tx, &cycle, Utc::now())
        })
    }

    /// Approves a `READY` cycle and generates its compliance report.
    ///
    /// The status change and its audit row are committed before the report
    /// is generated. If generation fails the cycle stays `APPROVED` without
    /// a report and [`LifecycleError::ReportGeneration`] is returned.
    pub fn approve(&self, cycle_id: i64) -> Result<ApprovalResult, LifecycleError> {
        let _span = info_span!("approve_cycle", cycle_id).entered();

        let (cycle, clients) =
            self.db
                .with_tx(|tx| -> Result<(CycleRow, Vec<ClientRef>), LifecycleError> {
                    let cycle = load(tx, cycle_id)?;
                    let next = cycle.status.apply(CycleTransition::Approve)?;

                    if cycle.program.as_deref().is_some_and(is_bowie_dick_program) {
                        return Err(LifecycleError::BowieDickTest { action: "approved" });
                    }
                    match cycle.cycle_type {
                        CycleType::Test => return Err(LifecycleError::TestCycle),
                        CycleType::Rejected => {
                            return Err(StateConflict::RejectedCannotBeApproved.into())
                        }
                        CycleType::Normal => {}
                    }
                    validate(&cycle.threshold_input(), Strictness::Strict).into_result()?;

                    let clients = client_repo::list(tx, cycle_id)?;
                    if clients.is_empty() {
                        return Err(LifecycleError::NoClients);
                    }

                    let now = Utc::now();
                    cycle_repo::set_status(tx, cycle_id, next, now)?;
                    log_repo::append(tx, cycle_id, LogAction::Approved, None, now)?;
                    Ok((load(tx, cycle_id)?, clients))
                })?;
        info!(cycle_number = cycle.cycle_number, "Cycle approved");

        let report = self.reports.generate(&cycle, &clients).map_err(|source| {
            warn!(error = %source, "Report generation failed for approved cycle");
            LifecycleError::ReportGeneration { cycle_id, source }
        })?;

        let report_path = report.path.to_string_lossy().into_owned();
        self.db.with_conn(|conn| {
            cycle_repo::set_generated_report_path(conn, cycle_id, &report_path, Utc::now())
        })?;

        Ok(ApprovalResult {
            cycle_id,
            approved: true,
            report_url: report.url,
            report_path: report.path,
        })
    }

    /// Rejects a `READY` cycle. The cycle type is forced to `REJECTED`.
    pub fn reject(&self, cycle_id: i64, reason: Option<&str>) -> Result<(), LifecycleError> {
        let _span = info_span!("reject_cycle", cycle_id).entered();
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());

        self.db.with_tx(|tx| -> Result<(), LifecycleError> {
            let cycle = load(tx, cycle_id)?;
            let next = cycle.status.apply(CycleTransition::Reject)?;
            let now = Utc::now();
            cycle_repo::set_status_and_type(tx, cycle_id, next, CycleType::Rejected, now)?;
            log_repo::append(tx, cycle_id, LogAction::Rejected, reason, now)?;
            Ok(())
        })?;

        info!(reason = reason.unwrap_or(""), "Cycle rejected");
        Ok(())
    }

    /// Rolls an `APPROVED` cycle back to `READY`.
    pub fn revert_to_ready(&self, cycle_id: i64) -> Result<(), LifecycleError> {
        let _span = info_span!("revert_cycle", cycle_id).entered();
        self.transition(cycle_id, CycleTransition::RevertToReady, LogAction::RevertedToReady)?;
        info!("Cycle reverted to READY");
        Ok(())
    }

    /// Moves an `APPROVED` cycle to the terminal `DOCUMENTED` state.
    pub fn mark_documented(&self, cycle_id: i64) -> Result<(), LifecycleError> {
        let _span = info_span!("document_cycle", cycle_id).entered();
        self.transition(cycle_id, CycleTransition::MarkDocumented, LogAction::Documented)?;
        info!("Cycle documented");
        Ok(())
    }

    fn transition(
        &self,
        cycle_id: i64,
        transition: CycleTransition,
        action: LogAction,
    ) -> Result<CycleStatus, LifecycleError> {
        self.db.with_tx(|tx| -> Result<CycleStatus, LifecycleError> {
            let cycle = load(tx, cycle_id)?;
            let next = cycle.status.apply(transition)?;
            let now = Utc::now();
            cycle_repo::set_status(tx, cycle_id, next, now)?;
            log_repo::append(tx, cycle_id, action, None, now)?;
            Ok(next)
        })
    }

    /// Applies manual corrections, then re-evaluates readiness.
    ///
    /// When the phase start or end changes without an explicit duration,
    /// the duration is derived again from the resulting timestamps.
    pub fn update_fields(
        &self,
        cycle_id: i64,
        mut update: CycleFieldUpdate,
    ) -> Result<CycleStatus, LifecycleError> {
        let _span = info_span!("update_cycle", cycle_id).entered();

        let details = format!("fields: {}", update.changed_fields().join(", "));
        let status = self.db.with_tx(|tx| -> Result<CycleStatus, LifecycleError> {
            let cycle = load(tx, cycle_id)?;
            ensure_editable(&cycle)?;

            if update.sterilization_duration_seconds.is_none()
                && (update.sterilization_start.is_some() || update.sterilization_end.is_some())
            {
                let start = update.sterilization_start.or(cycle.sterilization_start);
                let end = update.sterilization_end.or(cycle.sterilization_end);
                if let (Some(start), Some(end)) = (start, end) {
                    update.sterilization_duration_seconds = Some((end - start).num_seconds());
                }
            }

            let now = Utc::now();
            cycle_repo::apply_field_update(tx, cycle_id, &update, now)?;
            let updated = load(tx, cycle_id)?;
            let status = recompute(tx, &updated, now)?;

            log_repo::append(tx, cycle_id, LogAction::Updated, Some(&details), now)?;
            Ok(status)
        })?;

        info!(status = %status, "Cycle fields updated");
        Ok(status)
    }

    /// Links a client to a cycle and re-evaluates readiness.
    ///
    /// Adding a client to an `APPROVED` cycle reopens it, so the approval
    /// has to be granted again. Linking an already linked client changes
    /// nothing.
    pub fn add_client(
        &self,
        cycle_id: i64,
        client: &ClientRef,
    ) -> Result<CycleStatus, LifecycleError> {
        let _span = info_span!("add_client", cycle_id).entered();
        check_client(client)?;

        self.db.with_tx(|tx| -> Result<CycleStatus, LifecycleError> {
            let mut cycle = load(tx, cycle_id)?;
            if cycle.program.as_deref().is_some_and(is_bowie_dick_program) {
                return Err(LifecycleError::BowieDickTest {
                    action: "assigned clients",
                });
            }
            match cycle.status {
                CycleStatus::Rejected => return Err(StateConflict::AlreadyRejected.into()),
                CycleStatus::Documented => {
                    return Err(StateConflict::Settled(CycleStatus::Documented).into())
                }
                _ => {}
            }

            if !client_repo::add(tx, cycle_id, client)? {
                return Ok(cycle.status);
            }

            let now = Utc::now();
            if cycle.status == CycleStatus::Approved {
                let reopened = cycle.status.apply(CycleTransition::Reopen)?;
                cycle_repo::set_status(tx, cycle_id, reopened, now)?;
                cycle.status = reopened;
                info!("Approved cycle reopened by new client");
            }

            let status = recompute(tx, &cycle, now)?;
            let details = format!("client added: {}", client.identifier());
            log_repo::append(tx, cycle_id, LogAction::Updated, Some(&details), now)?;
            Ok(status)
        })
    }

    /// Unlinks a client and re-evaluates readiness. Removing the last
    /// client of a `READY` cycle drops it back to `IMPORTED`.
    pub fn remove_client(
        &self,
        cycle_id: i64,
        client: &ClientRef,
    ) -> Result<CycleStatus, LifecycleError> {
        let _span = info_span!("remove_client", cycle_id).entered();

        self.db.with_tx(|tx| -> Result<CycleStatus, LifecycleError> {
            let cycle = load(tx, cycle_id)?;
            ensure_editable(&cycle)?;

            if !client_repo::remove(tx, cycle_id, client)? {
                return Err(LifecycleError::ClientNotLinked {
                    cycle_id,
                    identifier: client.identifier().to_string(),
                });
            }

            let now = Utc::now();
            let status = recompute(tx, &cycle, now)?;
            let details = format!("client removed: {}", client.identifier());
            log_repo::append(tx, cycle_id, LogAction::Updated, Some(&details), now)?;
            Ok(status)
        })
    }

    /// Changes the identifier and/or display name of a manual client.
    pub fn rename_manual_client(
        &self,
        cycle_id: i64,
        identifier: &str,
        new_identifier: Option<&str>,
        new_name: Option<&str>,
    ) -> Result<(), LifecycleError> {
        let new_identifier = new_identifier.map(str::trim).filter(|s| !s.is_empty());
        let new_name = new_name.map(str::trim).filter(|s| !s.is_empty());

        self.db.with_tx(|tx| -> Result<(), LifecycleError> {
            let cycle = load(tx, cycle_id)?;
            ensure_editable(&cycle)?;

            if !client_repo::rename_manual(tx, cycle_id, identifier, new_identifier, new_name)? {
                return Err(LifecycleError::ClientNotLinked {
                    cycle_id,
                    identifier: identifier.to_string(),
                });
            }

            let details = format!(
                "manual client renamed: {} -> {}",
                identifier,
                new_identifier.unwrap_or(identifier)
            );
            log_repo::append(tx, cycle_id, LogAction::Updated, Some(&details), Utc::now())?;
            Ok(())
        })
    }

    /// Deletes a cycle with its clients and audit trail.
    pub fn delete_cycle(&self, cycle_id: i64) -> Result<(), LifecycleError> {
        let _span = info_span!("delete_cycle", cycle_id).entered();

        self.db.with_tx(|tx| -> Result<(), LifecycleError> {
            load(tx, cycle_id)?;
            log_repo::append(
                tx,
                cycle_id,
                LogAction::Deleted,
                Some("Deleted manually"),
                Utc::now(),
            )?;
            cycle_repo::delete(tx, cycle_id)?;
            Ok(())
        })?;

        info!("Cycle deleted");
        Ok(())
    }

    /// Deletes several cycles at once. Refused as a whole if any of them is
    /// still `IMPORTED`. Unknown ids are ignored. Returns how many were
    /// deleted.
    pub fn delete_cycles(&self, cycle_ids: &[i64]) -> Result<u64, LifecycleError> {
        let ids: BTreeSet<i64> = cycle_ids.iter().copied().collect();
        let ids: Vec<i64> = ids.into_iter().collect();

        let deleted = self.db.with_tx(|tx| -> Result<u64, LifecycleError> {
            let imported = cycle_repo::ids_with_status(tx, &ids, CycleStatus::Imported)?;
            if !imported.is_empty() {
                return Err(LifecycleError::DeleteImported { ids: imported });
            }

            let now = Utc::now();
            let mut deleted = 0;
            for &id in &ids {
                if cycle_repo::find_by_id(tx, id)?.is_none() {
                    continue;
                }
                log_repo::append(tx, id, LogAction::Deleted, Some("Deleted via bulk delete"), now)?;
                deleted += cycle_repo::delete(tx, id)?;
            }
            Ok(deleted)
        })?;

        info!(deleted, "Cycles deleted");
        Ok(deleted)
    }

    pub fn cycle(&self, cycle_id: i64) -> Result<CycleRow, LifecycleError> {
        self.db.with_conn(|conn| cycle_repo::find_by_id(conn, cycle_id))?
            .ok_or(LifecycleError::NotFound(cycle_id))
    }

    pub fn cycle_details(&self, cycle_id: i64) -> Result<CycleDetails, LifecycleError> {
        self.db.with_conn(|conn| {
            let Some(cycle) = cycle_repo::find_by_id(conn, cycle_id)? else {
                return Ok(None);
            };
            Ok(Some(CycleDetails {
                clients: client_repo::list(conn, cycle_id)?,
                logs: log_repo::list(conn, cycle_id)?,
                cycle,
            }))
        })?
        .ok_or(LifecycleError::NotFound(cycle_id))
    }

    pub fn logs(&self, cycle_id: i64) -> Result<Vec<CycleLogRow>, LifecycleError> {
        Ok(self.db.with_conn(|conn| log_repo::list(conn, cycle_id))?)
    }

    pub fn clients(&self, cycle_id: i64) -> Result<Vec<ClientRef>, LifecycleError> {
        Ok(self.db.with_conn(|conn| client_repo::list(conn, cycle_id))?)
    }

    pub fn search(&self, filter: &CycleFilter) -> Result<Vec<CycleSummary>, LifecycleError> {
        Ok(self.db.with_conn(|conn| cycle_repo::search(conn, filter))?)
    }

    /// Every cycle a client took part in, newest first.
    pub fn client_history(&self, identifier: &str) -> Result<Vec<CycleSummary>, LifecycleError> {
        Ok(self
            .db
            .with_conn(|conn| cycle_repo::find_by_client(conn, identifier))?)
    }

    /// Text of the archived source report.
    pub fn raw_report(&self, cycle_id: i64) -> Result<String, LifecycleError> {
        let cycle = self.cycle(cycle_id)?;
        let path = PathBuf::from(cycle.report_file_path.unwrap_or_default());
        let bytes = std::fs::read(&path).map_err(|source| LifecycleError::ReportFile {
            cycle_id,
            path: path.clone(),
            source,
        })?;
        let (text, _, _) = encoding_rs::UTF_16LE.decode(&bytes);
        Ok(text.into_owned())
    }
}

fn load(conn: &Connection, cycle_id: i64) -> Result<CycleRow, LifecycleError> {
    cycle_repo::find_by_id(conn, cycle_id)?.ok_or(LifecycleError::NotFound(cycle_id))
}

/// Client membership and measured values are frozen once approved.
fn ensure_editable(cycle: &CycleRow) -> Result<(), LifecycleError> {
    match cycle.status {
        CycleStatus::Approved => Err(StateConflict::ApprovedLocked.into()),
        CycleStatus::Documented => Err(StateConflict::Settled(CycleStatus::Documented).into()),
        _ => Ok(()),
    }
}

fn check_client(client: &ClientRef) -> Result<(), LifecycleError> {
    if client.identifier().trim().is_empty() {
        let message = if client.is_manual() {
            "manual identifier is empty"
        } else {
            "client id is empty"
        };
        return Err(LifecycleError::InvalidClient(message.to_string()));
    }
    Ok(())
}

fn recompute(
    conn: &Connection,
    cycle: &CycleRow,
    now: DateTime<Utc>,
) -> Result<CycleStatus, LifecycleError> {
    if cycle.status.is_settled() {
        return Ok(cycle.status);
    }

    let transition = if client_repo::count(conn, cycle.id)? == 0 {
        CycleTransition::MarkIncomplete
    } else if validate(&cycle.threshold_input(), Strictness::Coarse).is_valid() {
        CycleTransition::MarkReady
    } else {
        CycleTransition::MarkIncomplete
    };

    let next = cycle.status.apply(transition)?;
    if next != cycle.status {
        cycle_repo::set_status(conn, cycle.id, next, now)?;
    }
    Ok(next)
}

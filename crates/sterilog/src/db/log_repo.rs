//! Append-only audit trail for cycle transitions.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::Serialize;

use super::DatabaseError;
use crate::lifecycle::LogAction;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleLogRow {
    pub id: i64,
    pub cycle_id: i64,
    pub action: LogAction,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CycleLogRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let action: String = row.get("action")?;
        let action = LogAction::parse(&action).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown log action '{}'", action).into(),
            )
        })?;
        Ok(Self {
            id: row.get("id")?,
            cycle_id: row.get("cycle_id")?,
            action,
            details: row.get("details")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub fn append(
    conn: &Connection,
    cycle_id: i64,
    action: LogAction,
    details: Option<&str>,
    now: DateTime<Utc>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO sterilization_cycle_logs (cycle_id, action, details, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![cycle_id, action.as_str(), details, now],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Lists a cycle's log entries, newest first.
pub fn list(conn: &Connection, cycle_id: i64) -> Result<Vec<CycleLogRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM sterilization_cycle_logs WHERE cycle_id = ?1
         ORDER BY created_at DESC, id DESC",
    )?;
    let rows: Vec<CycleLogRow> = stmt
        .query_map(params![cycle_id], CycleLogRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count(conn: &Connection, cycle_id: i64) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row(
        "SELECT COUNT(*) FROM sterilization_cycle_logs WHERE cycle_id = ?1",
        params![cycle_id],
        |r| r.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{autoclave_repo, Database};
    use chrono::Duration;

    #[test]
    fn test_append_and_list_newest_first() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let ac = autoclave_repo::insert(conn, "A", "SN1", None, true)?;
            conn.execute(
                "INSERT INTO sterilization_cycles
                 (autoclave_id, cycle_number, created_at, updated_at)
                 VALUES (?1, 1, '2026-01-01 00:00:00Z', '2026-01-01 00:00:00Z')",
                params![ac],
            )?;
            let cycle = conn.last_insert_rowid();

            let t0 = Utc::now();
            append(conn, cycle, LogAction::Approved, None, t0)?;
            append(
                conn,
                cycle,
                LogAction::RevertedToReady,
                Some("wrong client"),
                t0 + Duration::seconds(5),
            )?;

            let logs = list(conn, cycle)?;
            assert_eq!(logs.len(), 2);
            assert_eq!(logs[0].action, LogAction::RevertedToReady);
            assert_eq!(logs[0].details.as_deref(), Some("wrong client"));
            assert_eq!(logs[1].action, LogAction::Approved);
            assert_eq!(count(conn, cycle)?, 2);
            Ok(())
        })
        .unwrap();
    }
}

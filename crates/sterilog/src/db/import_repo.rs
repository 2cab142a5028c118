//! Import ledger: one row per distinct report content hash.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::DatabaseError;

/// Ledger status written for every successfully decoded file.
pub const STATUS_PARSED: &str = "PARSED";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportImportRow {
    pub id: i64,
    pub autoclave_id: i64,
    pub file_name: String,
    pub file_path: String,
    pub file_hash: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl ReportImportRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            autoclave_id: row.get("autoclave_id")?,
            file_name: row.get("file_name")?,
            file_path: row.get("file_path")?,
            file_hash: row.get("file_hash")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Records an import. A hash that is already in the ledger is left as is.
///
/// Returns `true` when a new row was written.
pub fn record(
    conn: &Connection,
    autoclave_id: i64,
    file_name: &str,
    file_path: &str,
    file_hash: &str,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO sterilization_report_imports
         (autoclave_id, file_name, file_path, file_hash, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![autoclave_id, file_name, file_path, file_hash, STATUS_PARSED, now],
    )?;
    if inserted == 0 {
        log::debug!("Import ledger already holds hash {}", file_hash);
    }
    Ok(inserted > 0)
}

/// Ledger row for a content hash, if that content was imported before.
pub fn find_by_hash(
    conn: &Connection,
    file_hash: &str,
) -> Result<Option<ReportImportRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT * FROM sterilization_report_imports WHERE file_hash = ?1",
            params![file_hash],
            ReportImportRow::from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn count(conn: &Connection) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row(
        "SELECT COUNT(*) FROM sterilization_report_imports",
        [],
        |r| r.get(0),
    )?;
    Ok(count)
}

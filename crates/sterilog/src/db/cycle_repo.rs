//! Cycle repository: CRUD operations for the `sterilization_cycles` table.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::{escape_like, DatabaseError};
use crate::lifecycle::{CycleStatus, CycleType};
use crate::validation::ThresholdInput;

impl ToSql for CycleStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for CycleStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        CycleStatus::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown cycle status '{}'", text).into()))
    }
}

impl ToSql for CycleType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for CycleType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(CycleType::from_stored(value.as_str()?))
    }
}

/// A raw cycle row from the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleRow {
    pub id: i64,
    pub autoclave_id: i64,
    pub cycle_number: i64,
    pub cycle_start_datetime: Option<NaiveDateTime>,
    pub program: Option<String>,
    pub sterilization_start: Option<NaiveDateTime>,
    pub sterilization_end: Option<NaiveDateTime>,
    pub sterilization_duration_seconds: Option<i64>,
    pub pressure_min: Option<f64>,
    pub pressure_max: Option<f64>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub cycle_type: CycleType,
    pub status: CycleStatus,
    pub report_file_path: Option<String>,
    pub generated_report_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CycleRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            autoclave_id: row.get("autoclave_id")?,
            cycle_number: row.get("cycle_number")?,
            cycle_start_datetime: row.get("cycle_start_datetime")?,
            program: row.get("program")?,
            sterilization_start: row.get("sterilization_start")?,
            sterilization_end: row.get("sterilization_end")?,
            sterilization_duration_seconds: row.get("sterilization_duration_seconds")?,
            pressure_min: row.get("pressure_min")?,
            pressure_max: row.get("pressure_max")?,
            temperature_min: row.get("temperature_min")?,
            temperature_max: row.get("temperature_max")?,
            cycle_type: row.get("cycle_type")?,
            status: row.get("status")?,
            report_file_path: row.get("report_file_path")?,
            generated_report_path: row.get("generated_report_path")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// The fields the threshold rules look at.
    pub fn threshold_input(&self) -> ThresholdInput {
        ThresholdInput {
            program: self.program.clone(),
            temperature_min: self.temperature_min,
            pressure_min: self.pressure_min,
            duration_seconds: self.sterilization_duration_seconds,
        }
    }
}

/// Values for a freshly imported cycle.
#[derive(Debug, Clone)]
pub struct NewCycle {
    pub autoclave_id: i64,
    pub cycle_number: i64,
    pub cycle_start_datetime: Option<NaiveDateTime>,
    pub program: Option<String>,
    pub sterilization_start: Option<NaiveDateTime>,
    pub sterilization_end: Option<NaiveDateTime>,
    pub sterilization_duration_seconds: Option<i64>,
    pub pressure_min: Option<f64>,
    pub pressure_max: Option<f64>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub cycle_type: CycleType,
    pub status: CycleStatus,
    pub report_file_path: Option<String>,
}

/// Manual corrections to a cycle. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleFieldUpdate {
    pub program: Option<String>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub pressure_min: Option<f64>,
    pub pressure_max: Option<f64>,
    pub sterilization_duration_seconds: Option<i64>,
    pub sterilization_start: Option<NaiveDateTime>,
    pub sterilization_end: Option<NaiveDateTime>,
    pub cycle_type: Option<CycleType>,
}

impl CycleFieldUpdate {
    /// Names of the fields this update sets.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.program.is_some() {
            fields.push("program");
        }
        if self.temperature_min.is_some() {
            fields.push("temperature_min");
        }
        if self.temperature_max.is_some() {
            fields.push("temperature_max");
        }
        if self.pressure_min.is_some() {
            fields.push("pressure_min");
        }
        if self.pressure_max.is_some() {
            fields.push("pressure_max");
        }
        if self.sterilization_duration_seconds.is_some() {
            fields.push("sterilization_duration_seconds");
        }
        if self.sterilization_start.is_some() {
            fields.push("sterilization_start");
        }
        if self.sterilization_end.is_some() {
            fields.push("sterilization_end");
        }
        if self.cycle_type.is_some() {
            fields.push("cycle_type");
        }
        fields
    }
}

/// Query filter parameters for cycle listing.
#[derive(Debug, Default, Clone)]
pub struct CycleFilter {
    /// Substring of the cycle number.
    pub cycle_number: Option<String>,
    pub status: Option<CycleStatus>,
    pub date_from: Option<NaiveDateTime>,
    pub date_to: Option<NaiveDateTime>,
    /// Substring of a registered client id or manual identifier.
    pub client_identifier: Option<String>,
    /// Substring of the program label.
    pub program: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// One line of a cycle listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleSummary {
    pub id: i64,
    pub autoclave_id: i64,
    pub cycle_number: i64,
    pub cycle_start_datetime: Option<NaiveDateTime>,
    pub program: Option<String>,
    pub status: CycleStatus,
    pub cycle_type: CycleType,
    pub clients_count: u64,
}

impl CycleSummary {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            autoclave_id: row.get("autoclave_id")?,
            cycle_number: row.get("cycle_number")?,
            cycle_start_datetime: row.get("cycle_start_datetime")?,
            program: row.get("program")?,
            status: row.get("status")?,
            cycle_type: row.get("cycle_type")?,
            clients_count: row.get("clients_count")?,
        })
    }
}

const SUMMARY_COLUMNS: &str = "sc.id, sc.autoclave_id, sc.cycle_number, sc.cycle_start_datetime,
     sc.program, sc.status, sc.cycle_type,
     (SELECT COUNT(*) FROM sterilization_cycle_clients c WHERE c.cycle_id = sc.id) AS clients_count";

/// Inserts a new cycle row and returns its id.
pub fn insert(conn: &Connection, cycle: &NewCycle, now: DateTime<Utc>) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO sterilization_cycles (autoclave_id, cycle_number, cycle_start_datetime,
         program, sterilization_start, sterilization_end, sterilization_duration_seconds,
         pressure_min, pressure_max, temperature_min, temperature_max, cycle_type, status,
         report_file_path, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
        params![
            cycle.autoclave_id,
            cycle.cycle_number,
            cycle.cycle_start_datetime,
            cycle.program,
            cycle.sterilization_start,
            cycle.sterilization_end,
            cycle.sterilization_duration_seconds,
            cycle.pressure_min,
            cycle.pressure_max,
            cycle.temperature_min,
            cycle.temperature_max,
            cycle.cycle_type,
            cycle.status,
            cycle.report_file_path,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Finds a cycle by its ID.
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<CycleRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM sterilization_cycles WHERE id = ?1")?;
    let mut rows = stmt.query_map(params![id], CycleRow::from_row)?;
    match rows.next() {
        Some(Ok(row)) => Ok(Some(row)),
        Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
        None => Ok(None),
    }
}

/// Finds a cycle by its natural key.
pub fn find_by_number(
    conn: &Connection,
    autoclave_id: i64,
    cycle_number: i64,
) -> Result<Option<CycleRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM sterilization_cycles WHERE autoclave_id = ?1 AND cycle_number = ?2",
    )?;
    let mut rows = stmt.query_map(params![autoclave_id, cycle_number], CycleRow::from_row)?;
    match rows.next() {
        Some(Ok(row)) => Ok(Some(row)),
        Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
        None => Ok(None),
    }
}

pub fn set_status(
    conn: &Connection,
    id: i64,
    status: CycleStatus,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE sterilization_cycles SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, status, now],
    )?;
    Ok(())
}

/// Sets status and classification together (used for rejections).
pub fn set_status_and_type(
    conn: &Connection,
    id: i64,
    status: CycleStatus,
    cycle_type: CycleType,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE sterilization_cycles SET status = ?2, cycle_type = ?3, updated_at = ?4
         WHERE id = ?1",
        params![id, status, cycle_type, now],
    )?;
    Ok(())
}

pub fn set_generated_report_path(
    conn: &Connection,
    id: i64,
    path: &str,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE sterilization_cycles SET generated_report_path = ?2, updated_at = ?3
         WHERE id = ?1",
        params![id, path, now],
    )?;
    Ok(())
}

/// Applies manual corrections; absent fields keep their stored value.
pub fn apply_field_update(
    conn: &Connection,
    id: i64,
    update: &CycleFieldUpdate,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE sterilization_cycles SET
           program = COALESCE(?2, program),
           temperature_min = COALESCE(?3, temperature_min),
           temperature_max = COALESCE(?4, temperature_max),
           pressure_min = COALESCE(?5, pressure_min),
           pressure_max = COALESCE(?6, pressure_max),
           sterilization_duration_seconds = COALESCE(?7, sterilization_duration_seconds),
           sterilization_start = COALESCE(?8, sterilization_start),
           sterilization_end = COALESCE(?9, sterilization_end),
           cycle_type = COALESCE(?10, cycle_type),
           updated_at = ?11
         WHERE id = ?1",
        params![
            id,
            update.program,
            update.temperature_min,
            update.temperature_max,
            update.pressure_min,
            update.pressure_max,
            update.sterilization_duration_seconds,
            update.sterilization_start,
            update.sterilization_end,
            update.cycle_type,
            now,
        ],
    )?;
    Ok(())
}

/// Deletes a cycle. Client and log rows cascade. Returns rows deleted.
pub fn delete(conn: &Connection, id: i64) -> Result<u64, DatabaseError> {
    let count = conn.execute("DELETE FROM sterilization_cycles WHERE id = ?1", params![id])?;
    Ok(count as u64)
}

/// Returns the ids among `ids` whose cycles are currently in `status`.
pub fn ids_with_status(
    conn: &Connection,
    ids: &[i64],
    status: CycleStatus,
) -> Result<Vec<i64>, DatabaseError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<String> = (0..ids.len()).map(|i| format!("?{}", i + 2)).collect();
    let sql = format!(
        "SELECT id FROM sterilization_cycles WHERE status = ?1 AND id IN ({}) ORDER BY id",
        placeholders.join(", ")
    );

    let mut param_values: Vec<Box<dyn ToSql>> = Vec::new();
    param_values.push(Box::new(status));
    for &id in ids {
        param_values.push(Box::new(id));
    }

    let params_ref: Vec<&dyn ToSql> = param_values.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let found: Vec<i64> = stmt
        .query_map(params_ref.as_slice(), |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(found)
}

/// Queries cycles with filters, newest first.
pub fn search(conn: &Connection, filter: &CycleFilter) -> Result<Vec<CycleSummary>, DatabaseError> {
    let mut conditions = Vec::new();
    let mut param_values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(ref cycle_number) = filter.cycle_number {
        conditions.push(format!(
            "CAST(sc.cycle_number AS TEXT) LIKE ?{} ESCAPE '\\'",
            param_values.len() + 1
        ));
        param_values.push(Box::new(format!("%{}%", escape_like(cycle_number))));
    }
    if let Some(status) = filter.status {
        conditions.push(format!("sc.status = ?{}", param_values.len() + 1));
        param_values.push(Box::new(status));
    }
    if let Some(date_from) = filter.date_from {
        conditions.push(format!(
            "sc.cycle_start_datetime >= ?{}",
            param_values.len() + 1
        ));
        param_values.push(Box::new(date_from));
    }
    if let Some(date_to) = filter.date_to {
        conditions.push(format!(
            "sc.cycle_start_datetime <= ?{}",
            param_values.len() + 1
        ));
        param_values.push(Box::new(date_to));
    }
    if let Some(ref identifier) = filter.client_identifier {
        let n = param_values.len() + 1;
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM sterilization_cycle_clients f WHERE f.cycle_id = sc.id
             AND (f.client_id LIKE ?{n} ESCAPE '\\'
                  OR f.manual_identifier LIKE ?{n} ESCAPE '\\'))"
        ));
        param_values.push(Box::new(format!("%{}%", escape_like(identifier))));
    }
    if let Some(ref program) = filter.program {
        conditions.push(format!(
            "sc.program LIKE ?{} ESCAPE '\\'",
            param_values.len() + 1
        ));
        param_values.push(Box::new(format!("%{}%", escape_like(program))));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let limit = filter.limit.unwrap_or(50) as i64;
    let offset = filter.offset.unwrap_or(0) as i64;
    param_values.push(Box::new(limit));
    param_values.push(Box::new(offset));
    let sql = format!(
        "SELECT {} FROM sterilization_cycles sc {}
         ORDER BY sc.cycle_start_datetime DESC, sc.id DESC LIMIT ?{} OFFSET ?{}",
        SUMMARY_COLUMNS,
        where_clause,
        param_values.len() - 1,
        param_values.len()
    );

    let params_ref: Vec<&dyn ToSql> = param_values.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<CycleSummary> = stmt
        .query_map(params_ref.as_slice(), CycleSummary::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// All cycles a client (registered id or manual identifier) took part in.
pub fn find_by_client(
    conn: &Connection,
    identifier: &str,
) -> Result<Vec<CycleSummary>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM sterilization_cycles sc
         WHERE EXISTS (SELECT 1 FROM sterilization_cycle_clients f WHERE f.cycle_id = sc.id
                       AND (f.client_id = ?1 OR f.manual_identifier = ?1))
         ORDER BY sc.cycle_start_datetime DESC, sc.id DESC",
        SUMMARY_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<CycleSummary> = stmt
        .query_map(params![identifier], CycleSummary::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count(conn: &Connection) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row("SELECT COUNT(*) FROM sterilization_cycles", [], |r| r.get(0))?;
    Ok(count)
}

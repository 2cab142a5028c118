//! Autoclave repository: lookups on the `autoclaves` table.
//!
//! Autoclaves are registered by an external administration tool; the
//! import pipeline only reads them. [`insert`] exists for seeding.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{escape_like, DatabaseError};

/// A raw autoclave row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoclaveRow {
    pub id: i64,
    pub name: String,
    pub serial_number: String,
    pub usb_volume_serial: Option<String>,
    pub active: bool,
}

impl AutoclaveRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            serial_number: row.get("serial_number")?,
            usb_volume_serial: row.get("usb_volume_serial")?,
            active: row.get("active")?,
        })
    }
}

/// Inserts an autoclave and returns its id.
pub fn insert(
    conn: &Connection,
    name: &str,
    serial_number: &str,
    usb_volume_serial: Option<&str>,
    active: bool,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO autoclaves (name, serial_number, usb_volume_serial, active)
         VALUES (?1, ?2, ?3, ?4)",
        params![name, serial_number, usb_volume_serial, active],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Finds the first active autoclave whose serial number starts with `serial`.
///
/// Device exports sometimes truncate the serial, so the stored value only
/// needs to begin with the decoded one.
pub fn find_active_by_serial_prefix(
    conn: &Connection,
    serial: &str,
) -> Result<Option<AutoclaveRow>, DatabaseError> {
    if serial.is_empty() {
        return Ok(None);
    }
    let pattern = format!("{}%", escape_like(serial));
    let row = conn
        .query_row(
            "SELECT * FROM autoclaves
             WHERE serial_number LIKE ?1 ESCAPE '\\' AND active = 1
             ORDER BY id LIMIT 1",
            params![pattern],
            AutoclaveRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Finds the active autoclave bound to a removable volume serial.
pub fn find_active_by_volume_serial(
    conn: &Connection,
    volume_serial: &str,
) -> Result<Option<AutoclaveRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT * FROM autoclaves
             WHERE usb_volume_serial = ?1 AND active = 1
             ORDER BY id LIMIT 1",
            params![volume_serial],
            AutoclaveRow::from_row,
        )
        .optional()?;
    Ok(row)
}

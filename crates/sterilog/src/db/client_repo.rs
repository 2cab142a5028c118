//! Cycle client associations.
//!
//! Each row holds either a registered `client_id` or a manual identifier
//! (with an optional display name). The table enforces the exclusivity;
//! in Rust it is the [`ClientRef`] variant.

use rusqlite::{params, Connection, Row};

use super::DatabaseError;
use crate::lifecycle::ClientRef;

fn client_from_row(row: &Row<'_>) -> Result<ClientRef, rusqlite::Error> {
    let client_id: Option<String> = row.get("client_id")?;
    match client_id {
        Some(client_id) => Ok(ClientRef::Registered { client_id }),
        None => Ok(ClientRef::Manual {
            identifier: row.get("manual_identifier")?,
            name: row.get("manual_client_name")?,
        }),
    }
}

/// Links a client to a cycle. Returns `false` if it was already linked.
pub fn add(conn: &Connection, cycle_id: i64, client: &ClientRef) -> Result<bool, DatabaseError> {
    let inserted = match client {
        ClientRef::Registered { client_id } => conn.execute(
            "INSERT OR IGNORE INTO sterilization_cycle_clients (cycle_id, client_id)
             VALUES (?1, ?2)",
            params![cycle_id, client_id],
        )?,
        ClientRef::Manual { identifier, name } => conn.execute(
            "INSERT OR IGNORE INTO sterilization_cycle_clients
             (cycle_id, manual_identifier, manual_client_name)
             VALUES (?1, ?2, ?3)",
            params![cycle_id, identifier, name],
        )?,
    };
    Ok(inserted > 0)
}

/// Unlinks a client. Returns `false` if it was not linked.
pub fn remove(conn: &Connection, cycle_id: i64, client: &ClientRef) -> Result<bool, DatabaseError> {
    let removed = match client {
        ClientRef::Registered { client_id } => conn.execute(
            "DELETE FROM sterilization_cycle_clients WHERE cycle_id = ?1 AND client_id = ?2",
            params![cycle_id, client_id],
        )?,
        ClientRef::Manual { identifier, .. } => conn.execute(
            "DELETE FROM sterilization_cycle_clients
             WHERE cycle_id = ?1 AND manual_identifier = ?2",
            params![cycle_id, identifier],
        )?,
    };
    Ok(removed > 0)
}

/// Changes a manual client's identifier and/or name in place.
///
/// `None` keeps the stored value. Returns `false` if no such manual
/// client is linked to the cycle.
pub fn rename_manual(
    conn: &Connection,
    cycle_id: i64,
    identifier: &str,
    new_identifier: Option<&str>,
    new_name: Option<&str>,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE sterilization_cycle_clients
         SET manual_identifier = COALESCE(?3, manual_identifier),
             manual_client_name = COALESCE(?4, manual_client_name)
         WHERE cycle_id = ?1 AND manual_identifier = ?2",
        params![cycle_id, identifier, new_identifier, new_name],
    )?;
    Ok(updated > 0)
}

pub fn count(conn: &Connection, cycle_id: i64) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row(
        "SELECT COUNT(*) FROM sterilization_cycle_clients WHERE cycle_id = ?1",
        params![cycle_id],
        |r| r.get(0),
    )?;
    Ok(count)
}

/// Lists a cycle's clients in the order they were added.
pub fn list(conn: &Connection, cycle_id: i64) -> Result<Vec<ClientRef>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT client_id, manual_identifier, manual_client_name
         FROM sterilization_cycle_clients WHERE cycle_id = ?1 ORDER BY id",
    )?;
    let rows: Vec<ClientRef> = stmt
        .query_map(params![cycle_id], client_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{autoclave_repo, Database};

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let cycle_id = db
            .with_conn(|conn| {
                let ac = autoclave_repo::insert(conn, "A", "SN1", None, true)?;
                conn.execute(
                    "INSERT INTO sterilization_cycles
                     (autoclave_id, cycle_number, created_at, updated_at)
                     VALUES (?1, 1, '2026-01-01 00:00:00Z', '2026-01-01 00:00:00Z')",
                    params![ac],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .unwrap();
        (db, cycle_id)
    }

    #[test]
    fn test_add_list_and_duplicates() {
        let (db, cycle) = setup();
        db.with_conn(|conn| {
            assert!(add(conn, cycle, &ClientRef::registered("C-1"))?);
            assert!(!add(conn, cycle, &ClientRef::registered("C-1"))?);
            assert!(add(
                conn,
                cycle,
                &ClientRef::manual("walk-in 7", Some("Dr. Nowak".to_string()))
            )?);
            assert!(add(conn, cycle, &ClientRef::manual("walk-in 8", None))?);

            assert_eq!(count(conn, cycle)?, 3);
            assert_eq!(
                list(conn, cycle)?,
                vec![
                    ClientRef::registered("C-1"),
                    ClientRef::manual("walk-in 7", Some("Dr. Nowak".to_string())),
                    ClientRef::manual("walk-in 8", None),
                ]
            );
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_remove() {
        let (db, cycle) = setup();
        db.with_conn(|conn| {
            add(conn, cycle, &ClientRef::registered("C-1"))?;
            add(conn, cycle, &ClientRef::manual("m", None))?;

            assert!(remove(conn, cycle, &ClientRef::manual("m", None))?);
            assert!(!remove(conn, cycle, &ClientRef::manual("m", None))?);
            assert!(remove(conn, cycle, &ClientRef::registered("C-1"))?);
            assert_eq!(count(conn, cycle)?, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_rename_manual() {
        let (db, cycle) = setup();
        db.with_conn(|conn| {
            add(conn, cycle, &ClientRef::manual("old", Some("Name".to_string())))?;

            assert!(rename_manual(conn, cycle, "old", Some("new"), None)?);
            assert!(!rename_manual(conn, cycle, "old", None, Some("x"))?);
            assert_eq!(
                list(conn, cycle)?,
                vec![ClientRef::manual("new", Some("Name".to_string()))]
            );
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_clients_cascade_with_cycle() {
        let (db, cycle) = setup();
        db.with_conn(|conn| {
            add(conn, cycle, &ClientRef::registered("C-1"))?;
            conn.execute("DELETE FROM sterilization_cycles WHERE id = ?1", params![cycle])?;
            assert_eq!(count(conn, cycle)?, 0);
            Ok(())
        })
        .unwrap();
    }
}

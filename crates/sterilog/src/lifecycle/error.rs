use std::path::PathBuf;

use thiserror::Error;

use super::state::StateConflict;
use crate::db::DatabaseError;
use crate::report::ReportError;
use crate::validation::ValidationFailure;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Cycle {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    StateConflict(#[from] StateConflict),

    #[error("Cycle parameters invalid: {0}")]
    Validation(#[from] ValidationFailure),

    #[error("B-D test cycles cannot be {action}")]
    BowieDickTest { action: &'static str },

    #[error("TEST cycles cannot be approved")]
    TestCycle,

    #[error("Cycle must have at least one client")]
    NoClients,

    #[error("Invalid client: {0}")]
    InvalidClient(String),

    #[error("Client '{identifier}' is not linked to cycle {cycle_id}")]
    ClientNotLinked { cycle_id: i64, identifier: String },

    #[error("Cannot delete IMPORTED cycles: {ids:?}")]
    DeleteImported { ids: Vec<i64> },

    #[error("Cycle {cycle_id} approved but report generation failed: {source}")]
    ReportGeneration {
        cycle_id: i64,
        #[source]
        source: ReportError,
    },

    #[error("Raw report for cycle {cycle_id} unavailable at '{path}': {source}")]
    ReportFile {
        cycle_id: i64,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

use std::path::PathBuf;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::{DecodeError, StorageError};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read report '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse report: {0}")]
    Parse(#[from] DecodeError),

    #[error("Autoclave not registered for serial number '{serial}'")]
    UnregisteredAutoclave { serial: String },

    #[error("Failed to store report: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

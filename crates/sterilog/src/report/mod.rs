//! Compliance report generation for approved cycles.
//!
//! Rendering is an external concern; [`ReportGenerator`] is the seam the
//! lifecycle calls after approval. [`PdfReportGenerator`] is a minimal
//! single-page implementation.

pub mod pdf;

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::db::cycle_repo::CycleRow;
use crate::error::StorageError;
use crate::lifecycle::ClientRef;

pub use pdf::PdfReportGenerator;

/// Where a generated report was written and how callers can fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedReport {
    pub path: PathBuf,
    pub url: String,
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to build PDF: {0}")]
    Pdf(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub trait ReportGenerator: Send + Sync {
    fn generate(
        &self,
        cycle: &CycleRow,
        clients: &[ClientRef],
    ) -> Result<GeneratedReport, ReportError>;
}

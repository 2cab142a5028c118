//! Single-file import: dedup by content hash, autoclave resolution,
//! archiving, cycle insert and import-time auto-rejection.

mod error;
mod hash;
mod orchestrator;

pub use error::ImportError;
pub use hash::content_hash;
pub use orchestrator::{ImportOrchestrator, ImportOutcome};

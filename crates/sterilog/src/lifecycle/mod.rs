//! Approval workflow for imported cycles.
//!
//! [`CycleLifecycle`] owns every status change after import. Transitions
//! are decided by [`CycleStatus::apply`]; each state-changing call writes
//! exactly one audit row in the same transaction as the change.

mod client;
mod error;
mod service;
mod state;

pub use crate::db::cycle_repo::{CycleFieldUpdate, CycleFilter, CycleRow, CycleSummary};
pub use crate::db::log_repo::CycleLogRow;
pub use client::ClientRef;
pub use error::LifecycleError;
pub use service::{ApprovalResult, CycleDetails, CycleLifecycle};
pub use state::{CycleStatus, CycleTransition, CycleType, LogAction, StateConflict};

//! Cycle workflow states and the transition function between them.
//!
//! ```text
//! IMPORTED ⇄ READY → APPROVED → DOCUMENTED
//!    │         │        │
//!    │         │        └─(revert)→ READY, (reopen)→ IMPORTED
//!    └─(auto)──┴─(reject)→ REJECTED
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Workflow status of a sterilization cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleStatus {
    Imported,
    Ready,
    Approved,
    Rejected,
    Documented,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Imported => "IMPORTED",
            Self::Ready => "READY",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Documented => "DOCUMENTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "IMPORTED" => Some(Self::Imported),
            "READY" => Some(Self::Ready),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "DOCUMENTED" => Some(Self::Documented),
            _ => None,
        }
    }

    /// Statuses that readiness recomputation must leave untouched.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Documented)
    }

    /// Applies a transition, returning the resulting status or the reason
    /// the transition is refused from the current one.
    pub fn apply(self, transition: CycleTransition) -> Result<CycleStatus, StateConflict> {
        use CycleStatus::*;
        use CycleTransition::*;

        match (transition, self) {
            (MarkReady, Imported | Ready) => Ok(Ready),
            (MarkIncomplete, Imported | Ready) => Ok(Imported),
            (MarkReady | MarkIncomplete, from) => Err(StateConflict::Settled(from)),

            (AutoReject, Imported) => Ok(Rejected),
            (AutoReject, from) => Err(StateConflict::Settled(from)),

            (Approve, Approved) => Err(StateConflict::AlreadyApproved),
            (Approve, Rejected) => Err(StateConflict::RejectedCannotBeApproved),
            (Approve, Ready) => Ok(Approved),
            (Approve, from) => Err(StateConflict::NotReady(from)),

            (Reject, Approved) => Err(StateConflict::ApprovedLocked),
            (Reject, Rejected) => Err(StateConflict::AlreadyRejected),
            (Reject, Ready) => Ok(Rejected),
            (Reject, from) => Err(StateConflict::RejectRequiresReady(from)),

            (RevertToReady, Approved) => Ok(Ready),
            (MarkDocumented, Approved) => Ok(Documented),
            (Reopen, Approved) => Ok(Imported),
            (t @ (RevertToReady | MarkDocumented | Reopen), from) => {
                Err(StateConflict::RequiresApproved {
                    action: t.describe(),
                    from,
                })
            }
        }
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested change of workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleTransition {
    /// Readiness recompute found clients and passing thresholds.
    MarkReady,
    /// Readiness recompute found no clients or failing thresholds.
    MarkIncomplete,
    /// Import-time threshold failure.
    AutoReject,
    Approve,
    Reject,
    RevertToReady,
    MarkDocumented,
    /// An approved cycle gained a client and must be re-evaluated.
    Reopen,
}

impl CycleTransition {
    fn describe(&self) -> &'static str {
        match self {
            Self::MarkReady => "marked ready",
            Self::MarkIncomplete => "marked incomplete",
            Self::AutoReject => "auto-rejected",
            Self::Approve => "approved",
            Self::Reject => "rejected",
            Self::RevertToReady => "reverted to READY",
            Self::MarkDocumented => "documented",
            Self::Reopen => "reopened",
        }
    }
}

/// Refusal of a transition from the current status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateConflict {
    #[error("Cycle already approved")]
    AlreadyApproved,

    #[error("Rejected cycle cannot be approved")]
    RejectedCannotBeApproved,

    #[error("Cycle must have READY status before approval (current: {0})")]
    NotReady(CycleStatus),

    #[error("Cannot modify approved cycle")]
    ApprovedLocked,

    #[error("Cannot modify rejected cycle")]
    AlreadyRejected,

    #[error("Only READY cycles can be rejected (current: {0})")]
    RejectRequiresReady(CycleStatus),

    #[error("Only APPROVED cycles can be {action} (current: {from})")]
    RequiresApproved {
        action: &'static str,
        from: CycleStatus,
    },

    #[error("Cycle is {0} and its readiness can no longer change")]
    Settled(CycleStatus),
}

/// Classification of a cycle, decided at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleType {
    Normal,
    Test,
    Rejected,
}

impl CycleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Test => "TEST",
            Self::Rejected => "REJECTED",
        }
    }

    /// Parses a stored value. Anything unrecognized is treated as `NORMAL`.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "TEST" => Self::Test,
            "REJECTED" => Self::Rejected,
            _ => Self::Normal,
        }
    }
}

impl fmt::Display for CycleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit-trail action label written to `sterilization_cycle_logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogAction {
    Approved,
    Rejected,
    RevertedToReady,
    Documented,
    Deleted,
    Updated,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::RevertedToReady => "REVERTED_TO_READY",
            Self::Documented => "DOCUMENTED",
            Self::Deleted => "DELETED",
            Self::Updated => "UPDATED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "REVERTED_TO_READY" => Some(Self::RevertedToReady),
            "DOCUMENTED" => Some(Self::Documented),
            "DELETED" => Some(Self::Deleted),
            "UPDATED" => Some(Self::Updated),
            _ => None,
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Program-specific safety thresholds for sterilization cycles.
//!
//! Validation is pure: the same [`ThresholdInput`] always yields the same
//! [`ValidationReport`]. Callers that only need a verdict use
//! [`ValidationReport::is_valid`]; approval surfaces every [`Violation`].

mod program;
mod rules;

pub use program::{detected_temperature, is_bowie_dick_program, Program};
pub use rules::{validate, Strictness, ThresholdInput, ValidationFailure, ValidationReport, Violation};

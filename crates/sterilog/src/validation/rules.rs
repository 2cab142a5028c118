use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::program::{detected_temperature, Program};

/// Numeric fields of a cycle that the threshold rules look at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdInput {
    pub program: Option<String>,
    pub temperature_min: Option<f64>,
    pub pressure_min: Option<f64>,
    pub duration_seconds: Option<i64>,
}

/// Which rule set to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Every rule. Used at import and approval.
    Strict,
    /// Readiness recompute: the duration upper bound is not checked.
    Coarse,
}

/// One violated rule, with the context needed to explain it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Violation {
    UnsupportedProgram { detected: Option<u32> },
    TemperatureMissing,
    TemperatureTooLow { program: u32, minimum: f64, actual: f64 },
    PressureMissing,
    PressureTooLow { program: u32, minimum: f64, actual: f64 },
    DurationMissing,
    DurationTooShort { program: u32, minimum: i64, actual: i64 },
    DurationTooLong { program: u32, maximum: i64, actual: i64 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedProgram { detected: None } => {
                write!(f, "unsupported or undetected program")
            }
            Self::UnsupportedProgram {
                detected: Some(degrees),
            } => write!(f, "unsupported program: {}° (expected 121° or 134°)", degrees),
            Self::TemperatureMissing => write!(f, "minimum temperature missing"),
            Self::TemperatureTooLow {
                program, minimum, ..
            } => write!(f, "temperature too low: minimum for {}° is {}", program, minimum),
            Self::PressureMissing => write!(f, "minimum pressure missing"),
            Self::PressureTooLow {
                program, minimum, ..
            } => write!(f, "pressure too low: minimum for {}° is {}", program, minimum),
            Self::DurationMissing => write!(f, "sterilization duration missing"),
            Self::DurationTooShort {
                program, minimum, ..
            } => write!(
                f,
                "sterilization too short: minimum for {}° is {} s",
                program, minimum
            ),
            Self::DurationTooLong {
                program, maximum, ..
            } => write!(
                f,
                "sterilization too long: maximum for {}° is {} s",
                program, maximum
            ),
        }
    }
}

/// Outcome of [`validate`]. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }

    /// Converts a failing report into an error.
    pub fn into_result(self) -> Result<(), ValidationFailure> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ValidationFailure { report: self })
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("; "))
    }
}

/// A non-empty validation report used as an error.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{report}")]
pub struct ValidationFailure {
    pub report: ValidationReport,
}

/// Checks a cycle against the thresholds of its program.
///
/// When the program is unsupported only the presence of each measurement
/// is checked, since the thresholds depend on the program.
pub fn validate(input: &ThresholdInput, strictness: Strictness) -> ValidationReport {
    let mut violations = Vec::new();

    let detected = input.program.as_deref().and_then(detected_temperature);
    let program = detected.and_then(Program::from_temperature);
    if program.is_none() {
        violations.push(Violation::UnsupportedProgram { detected });
    }

    match (input.temperature_min, program) {
        (None, _) => violations.push(Violation::TemperatureMissing),
        (Some(actual), Some(p)) if actual < f64::from(p.temperature()) => {
            violations.push(Violation::TemperatureTooLow {
                program: p.temperature(),
                minimum: f64::from(p.temperature()),
                actual,
            })
        }
        _ => {}
    }

    match (input.pressure_min, program) {
        (None, _) => violations.push(Violation::PressureMissing),
        (Some(actual), Some(p)) if actual < f64::from(p.pressure_floor()) => {
            violations.push(Violation::PressureTooLow {
                program: p.temperature(),
                minimum: f64::from(p.pressure_floor()),
                actual,
            })
        }
        _ => {}
    }

    match (input.duration_seconds, program) {
        (None, _) => violations.push(Violation::DurationMissing),
        (Some(actual), Some(p)) => {
            let window = p.duration_window();
            if actual < *window.start() {
                violations.push(Violation::DurationTooShort {
                    program: p.temperature(),
                    minimum: *window.start(),
                    actual,
                });
            } else if strictness == Strictness::Strict && actual > *window.end() {
                violations.push(Violation::DurationTooLong {
                    program: p.temperature(),
                    maximum: *window.end(),
                    actual,
                });
            }
        }
        (Some(_), None) => {}
    }

    ValidationReport { violations }
}

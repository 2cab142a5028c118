use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Supported sterilization programs, named by their target temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Program {
    #[serde(rename = "121")]
    Deg121,
    #[serde(rename = "134")]
    Deg134,
}

impl Program {
    pub fn from_temperature(degrees: u32) -> Option<Self> {
        match degrees {
            121 => Some(Self::Deg121),
            134 => Some(Self::Deg134),
            _ => None,
        }
    }

    /// Resolves a free-text program label such as `"134℃"`.
    pub fn from_label(label: &str) -> Option<Self> {
        detected_temperature(label).and_then(Self::from_temperature)
    }

    /// Target temperature in degrees Celsius.
    pub fn temperature(&self) -> u32 {
        match self {
            Self::Deg121 => 121,
            Self::Deg134 => 134,
        }
    }

    /// Lowest acceptable minimum pressure.
    pub fn pressure_floor(&self) -> u32 {
        match self {
            Self::Deg121 => 100,
            Self::Deg134 => 200,
        }
    }

    /// Accepted sterilization phase length in seconds, bounds inclusive.
    pub fn duration_window(&self) -> RangeInclusive<i64> {
        match self {
            Self::Deg121 => 20 * 60..=23 * 60,
            Self::Deg134 => 210..=5 * 60,
        }
    }
}

/// First run of digits in a program label, read as degrees.
pub fn detected_temperature(label: &str) -> Option<u32> {
    DIGITS_RE
        .find(label)
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// Whether the program label names a Bowie-Dick test run.
pub fn is_bowie_dick_program(label: &str) -> bool {
    let upper = label.to_uppercase();
    upper.contains("B-D") || upper.contains("BD")
}

//! Label text of the autoclave export format.
//!
//! These strings are dictated by the device vendor and must match the
//! exported files exactly.

use std::sync::LazyLock;

use regex::Regex;

pub const SERIAL_LABEL: &str = "Nr seryjny:";
pub const CYCLE_NUMBER_LABEL: &str = "Ilość:";
pub const DATE_LABEL: &str = "Data:";
pub const TIME_LABEL: &str = "Czas:";
pub const PROGRAM_LABEL: &str = "Program:";
pub const STERILIZATION_START_LABEL: &str = "Start sterylizacji";
pub const STERILIZATION_END_LABEL: &str = "Koniec sterylizacji";
pub const PRESSURE_MAX_LABEL: &str = "Maks ciśnienie:";
pub const PRESSURE_MIN_LABEL: &str = "Min ciśnienie:";
pub const TEMPERATURE_MAX_LABEL: &str = "Maks temp:";
pub const TEMPERATURE_MIN_LABEL: &str = "Min temp:";

/// Present anywhere in the body of a Bowie-Dick test report.
pub const BOWIE_DICK_MARKER: &str = "B-D test";

/// Footer written as the last line of a cycle that ran to completion.
pub const TERMINATION_MARKERS: [&str; 2] = ["Koniec", "Finished"];

pub const DATE_FORMAT: &str = "%d-%m-%Y";
pub const TIME_FORMAT: &str = "%H:%M:%S";

// Pre-compiled field extractors. Values never span a line break.
pub(crate) static RE_SERIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"{}([^\r\n]+)", regex::escape(SERIAL_LABEL))).unwrap());
pub(crate) static RE_CYCLE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"{}(\d+)", regex::escape(CYCLE_NUMBER_LABEL))).unwrap());
pub(crate) static RE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{}(\d{{2}}-\d{{2}}-\d{{4}})", regex::escape(DATE_LABEL))).unwrap()
});
pub(crate) static RE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{}(\d{{2}}:\d{{2}}:\d{{2}})", regex::escape(TIME_LABEL))).unwrap()
});
pub(crate) static RE_PROGRAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"{}([^\r\n]+)", regex::escape(PROGRAM_LABEL))).unwrap());
pub(crate) static RE_STERILIZATION_START: LazyLock<Regex> =
    LazyLock::new(|| time_after_label(STERILIZATION_START_LABEL));
pub(crate) static RE_STERILIZATION_END: LazyLock<Regex> =
    LazyLock::new(|| time_after_label(STERILIZATION_END_LABEL));
pub(crate) static RE_PRESSURE_MAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Maks ciśnienie:\s*(\d+)").unwrap());
pub(crate) static RE_PRESSURE_MIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Min\s+ciśnienie:\s*(\d+)").unwrap());
pub(crate) static RE_TEMPERATURE_MAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Maks temp:\s*([\d.]+)").unwrap());
pub(crate) static RE_TEMPERATURE_MIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Min temp:\s*([\d.]+)").unwrap());
pub(crate) static RE_PROGRAM_TEMPERATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+℃").unwrap());

/// The first `HH:MM:SS` token following `label`, across line breaks.
fn time_after_label(label: &str) -> Regex {
    Regex::new(&format!(r"(?s){}.*?(\d{{2}}:\d{{2}}:\d{{2}})", regex::escape(label))).unwrap()
}

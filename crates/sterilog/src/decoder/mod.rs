//! Decoding of autoclave report exports.
//!
//! A report is UTF-16LE text with label/value pairs in a fixed Polish
//! layout. [`decode_report`] is a pure function of the input bytes.

pub mod markers;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::Serialize;

use crate::error::DecodeError;
use crate::lifecycle::CycleType;
use crate::validation::ThresholdInput;
use markers::*;

/// Structured content of one report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedReport {
    pub serial_number: String,
    pub cycle_number: i64,
    pub cycle_start_datetime: Option<NaiveDateTime>,
    pub program: Option<String>,
    pub sterilization_start: Option<NaiveDateTime>,
    pub sterilization_end: Option<NaiveDateTime>,
    pub sterilization_duration_seconds: Option<i64>,
    pub pressure_min: Option<f64>,
    pub pressure_max: Option<f64>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub cycle_type: CycleType,
}

impl DecodedReport {
    /// Sterilization phase length in whole minutes, e.g. `"22 min"`.
    pub fn duration_label(&self) -> Option<String> {
        self.sterilization_duration_seconds
            .map(|s| format!("{} min", (s as f64 / 60.0).round() as i64))
    }

    pub fn threshold_input(&self) -> ThresholdInput {
        ThresholdInput {
            program: self.program.clone(),
            temperature_min: self.temperature_min,
            pressure_min: self.pressure_min,
            duration_seconds: self.sterilization_duration_seconds,
        }
    }
}

/// Decodes raw UTF-16LE report bytes.
pub fn decode_report(bytes: &[u8]) -> Result<DecodedReport, DecodeError> {
    let (text, _, had_errors) = encoding_rs::UTF_16LE.decode(bytes);
    if had_errors {
        log::debug!("Report contained malformed UTF-16 sequences; replaced");
    }
    decode_text(&text)
}

/// Decodes report text that has already been converted from UTF-16.
pub fn decode_text(text: &str) -> Result<DecodedReport, DecodeError> {
    let serial_number =
        extract(&RE_SERIAL, text).ok_or(DecodeError::MissingField("serial_number"))?;
    let cycle_number_raw =
        extract(&RE_CYCLE_NUMBER, text).ok_or(DecodeError::MissingField("cycle_number"))?;
    let cycle_number = cycle_number_raw
        .parse::<i64>()
        .map_err(|_| DecodeError::InvalidNumber {
            field: "cycle_number",
            value: cycle_number_raw.clone(),
        })?;

    let date = extract(&RE_DATE, text)
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                .map_err(|_| DecodeError::InvalidTimestamp { field: "date", value: raw })
        })
        .transpose()?;

    let cycle_start_datetime = compose(date, extract(&RE_TIME, text), "cycle_start_time")?;
    let sterilization_start = compose(
        date,
        extract(&RE_STERILIZATION_START, text),
        "sterilization_start",
    )?;
    let mut sterilization_end = compose(
        date,
        extract(&RE_STERILIZATION_END, text),
        "sterilization_end",
    )?;

    // The phase crossed midnight: the end belongs to the next day.
    if let (Some(start), Some(end)) = (sterilization_start, sterilization_end) {
        if end < start {
            sterilization_end = Some(end + Duration::days(1));
        }
    }

    let sterilization_duration_seconds = match (sterilization_start, sterilization_end) {
        (Some(start), Some(end)) => Some((end - start).num_seconds()),
        _ => None,
    };

    Ok(DecodedReport {
        serial_number,
        cycle_number,
        cycle_start_datetime,
        program: extract(&RE_PROGRAM, text).map(reduce_program),
        sterilization_start,
        sterilization_end,
        sterilization_duration_seconds,
        pressure_min: extract_number(&RE_PRESSURE_MIN, text),
        pressure_max: extract_number(&RE_PRESSURE_MAX, text),
        temperature_min: extract_number(&RE_TEMPERATURE_MIN, text),
        temperature_max: extract_number(&RE_TEMPERATURE_MAX, text),
        cycle_type: classify(text),
    })
}

/// Decides the cycle type from the report's markers.
pub fn classify(text: &str) -> CycleType {
    if text.contains(BOWIE_DICK_MARKER) {
        return CycleType::Test;
    }

    let cleaned = strip_nul(text);
    let last_line = cleaned
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(str::trim_end);

    match last_line {
        Some(line) if TERMINATION_MARKERS.contains(&line) => CycleType::Normal,
        _ => CycleType::Rejected,
    }
}

fn strip_nul(value: &str) -> String {
    value.replace('\0', "")
}

/// First capture group of `re`, without NUL padding and trimmed.
/// Blank values count as absent.
fn extract(re: &Regex, text: &str) -> Option<String> {
    let caps = re.captures(text)?;
    let value = strip_nul(caps.get(1)?.as_str()).trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn extract_number(re: &Regex, text: &str) -> Option<f64> {
    extract(re, text).and_then(|raw| raw.parse::<f64>().ok())
}

/// Reduces a program label to its temperature marker when it has one.
fn reduce_program(label: String) -> String {
    match RE_PROGRAM_TEMPERATURE.find(&label) {
        Some(m) => m.as_str().to_string(),
        None => label,
    }
}

fn compose(
    date: Option<NaiveDate>,
    time: Option<String>,
    field: &'static str,
) -> Result<Option<NaiveDateTime>, DecodeError> {
    let (Some(date), Some(raw)) = (date, time) else {
        return Ok(None);
    };
    let time = NaiveTime::parse_from_str(&raw, TIME_FORMAT)
        .map_err(|_| DecodeError::InvalidTimestamp { field, value: raw })?;
    Ok(Some(date.and_time(time)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    fn report(program: &str, start: &str, end: &str, footer: &str) -> String {
        format!(
            "Autoklaw\r\n\
             Nr seryjny:SN12345678\0\0\r\n\
             Ilość:1234\r\n\
             Data:05-03-2026\r\n\
             Czas:09:15:02\r\n\
             Program:{program}\r\n\
             Start sterylizacji\r\n  {start}\r\n\
             Koniec sterylizacji\r\n  {end}\r\n\
             Maks ciśnienie: 215\r\n\
             Min ciśnienie: 205\r\n\
             Maks temp: 136.1\r\n\
             Min temp: 134.4\r\n\
             {footer}\r\n\r\n"
        )
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 5)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_decodes_all_fields() {
        let text = report("Program 134℃ narzędzia", "09:40:10", "09:44:10", "Koniec");
        let decoded = decode_report(&utf16le(&text)).unwrap();

        assert_eq!(decoded.serial_number, "SN12345678");
        assert_eq!(decoded.cycle_number, 1234);
        assert_eq!(decoded.cycle_start_datetime, Some(at(9, 15, 2)));
        assert_eq!(decoded.program.as_deref(), Some("134℃"));
        assert_eq!(decoded.sterilization_start, Some(at(9, 40, 10)));
        assert_eq!(decoded.sterilization_end, Some(at(9, 44, 10)));
        assert_eq!(decoded.sterilization_duration_seconds, Some(240));
        assert_eq!(decoded.pressure_max, Some(215.0));
        assert_eq!(decoded.pressure_min, Some(205.0));
        assert_eq!(decoded.temperature_max, Some(136.1));
        assert_eq!(decoded.temperature_min, Some(134.4));
        assert_eq!(decoded.cycle_type, CycleType::Normal);
        assert_eq!(decoded.duration_label().as_deref(), Some("4 min"));
    }

    #[test]
    fn test_duration_is_whole_seconds() {
        let text = report("121℃", "10:00:00", "10:21:30", "Koniec");
        let decoded = decode_text(&text).unwrap();
        assert_eq!(decoded.sterilization_duration_seconds, Some(1290));
        assert_eq!(decoded.duration_label().as_deref(), Some("22 min"));
    }

    #[test]
    fn test_end_after_midnight_rolls_over() {
        let text = report("134℃", "23:58:00", "00:02:00", "Koniec");
        let decoded = decode_text(&text).unwrap();
        assert_eq!(decoded.sterilization_duration_seconds, Some(240));
        assert_eq!(
            decoded.sterilization_end,
            Some(at(0, 2, 0) + Duration::days(1))
        );
    }

    #[test]
    fn test_leading_bom_is_ignored() {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(utf16le(&report("134℃", "09:40:10", "09:44:10", "Koniec")));
        let decoded = decode_report(&bytes).unwrap();
        assert_eq!(decoded.serial_number, "SN12345678");
    }

    #[test]
    fn test_program_without_marker_kept_trimmed() {
        let text = report("  Prion\0\0 ", "09:40:10", "09:44:10", "Koniec");
        let decoded = decode_text(&text).unwrap();
        assert_eq!(decoded.program.as_deref(), Some("Prion"));
    }

    #[test]
    fn test_classification() {
        let normal = report("134℃", "09:40:10", "09:44:10", "Koniec");
        assert_eq!(classify(&normal), CycleType::Normal);

        let english = report("134℃", "09:40:10", "09:44:10", "Finished");
        assert_eq!(classify(&english), CycleType::Normal);

        let aborted = report("134℃", "09:40:10", "09:44:10", "Przerwano");
        assert_eq!(classify(&aborted), CycleType::Rejected);

        let padded = format!("{}\0\0\0", normal);
        assert_eq!(classify(&padded), CycleType::Normal);

        let test = report("B-D test", "09:40:10", "09:44:10", "Przerwano");
        assert_eq!(classify(&test), CycleType::Test);
    }

    #[test]
    fn test_truncated_report_is_rejected_even_if_thresholds_pass() {
        let text = report("134℃", "09:40:10", "09:44:10", "Min temp: 134.4");
        let decoded = decode_text(&text).unwrap();
        assert_eq!(decoded.cycle_type, CycleType::Rejected);
        assert!(crate::validation::validate(
            &decoded.threshold_input(),
            crate::validation::Strictness::Strict
        )
        .is_valid());
    }

    #[test]
    fn test_missing_required_fields() {
        assert_eq!(
            decode_text("Ilość:5\r\nKoniec"),
            Err(DecodeError::MissingField("serial_number"))
        );
        assert_eq!(
            decode_text("Nr seryjny:SN1\r\nKoniec"),
            Err(DecodeError::MissingField("cycle_number"))
        );
        assert_eq!(
            decode_text("Nr seryjny:  \r\nIlość:5\r\nKoniec"),
            Err(DecodeError::MissingField("serial_number"))
        );
    }

    #[test]
    fn test_optional_fields_absent() {
        let decoded = decode_text("Nr seryjny:SN1\r\nIlość:5\r\nKoniec").unwrap();
        assert_eq!(decoded.cycle_start_datetime, None);
        assert_eq!(decoded.program, None);
        assert_eq!(decoded.sterilization_duration_seconds, None);
        assert_eq!(decoded.pressure_min, None);
        assert_eq!(decoded.duration_label(), None);
    }

    #[test]
    fn test_invalid_date() {
        let text = "Nr seryjny:SN1\r\nIlość:5\r\nData:31-02-2026\r\nKoniec";
        assert!(matches!(
            decode_text(text),
            Err(DecodeError::InvalidTimestamp { field: "date", .. })
        ));
    }

    #[test]
    fn test_decoding_is_deterministic() {
        let bytes = utf16le(&report("121℃", "10:00:00", "10:21:30", "Koniec"));
        assert_eq!(decode_report(&bytes), decode_report(&bytes));
    }
}

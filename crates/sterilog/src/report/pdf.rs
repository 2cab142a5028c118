use std::path::{Path, PathBuf};

use lopdf::{dictionary, Document, Object, Stream};

use super::{GeneratedReport, ReportError, ReportGenerator};
use crate::db::cycle_repo::CycleRow;
use crate::error::StorageError;
use crate::lifecycle::ClientRef;
use crate::storage::ensure_directory;

const DEFAULT_URL_PREFIX: &str = "/generated/sterilization";

/// Writes a text PDF per approved cycle, one A4 page per 50 lines.
pub struct PdfReportGenerator {
    directory: PathBuf,
    url_prefix: String,
}

impl PdfReportGenerator {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
        }
    }

    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    pub fn file_name(cycle_id: i64) -> String {
        format!("sterilization_report_cycle_{}.pdf", cycle_id)
    }
}

impl ReportGenerator for PdfReportGenerator {
    fn generate(
        &self,
        cycle: &CycleRow,
        clients: &[ClientRef],
    ) -> Result<GeneratedReport, ReportError> {
        let bytes = create_report_pdf(&report_lines(cycle, clients))?;

        ensure_directory(&self.directory)?;
        let file_name = Self::file_name(cycle.id);
        let path = self.directory.join(&file_name);
        std::fs::write(&path, bytes).map_err(|e| StorageError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        Ok(GeneratedReport {
            path,
            url: format!("{}/{}", self.url_prefix.trim_end_matches('/'), file_name),
        })
    }
}

fn report_lines(cycle: &CycleRow, clients: &[ClientRef]) -> Vec<String> {
    let dash = || "-".to_string();
    let mut lines = vec![
        "STERILIZATION REPORT".to_string(),
        String::new(),
        format!("Cycle number: {}", cycle.cycle_number),
        format!("Autoclave: {}", cycle.autoclave_id),
        format!(
            "Cycle start: {}",
            cycle.cycle_start_datetime.map_or_else(dash, |t| t.to_string())
        ),
        format!(
            "Program: {}",
            cycle.program.as_deref().unwrap_or("-").replace('℃', " C")
        ),
        format!(
            "Sterilization: {} - {}",
            cycle.sterilization_start.map_or_else(dash, |t| t.to_string()),
            cycle.sterilization_end.map_or_else(dash, |t| t.to_string())
        ),
        format!(
            "Duration: {}",
            format_duration(cycle.sterilization_duration_seconds)
        ),
        format!(
            "Pressure: min {} / max {}",
            format_value(cycle.pressure_min),
            format_value(cycle.pressure_max)
        ),
        format!(
            "Temperature: min {} / max {}",
            format_value(cycle.temperature_min),
            format_value(cycle.temperature_max)
        ),
        String::new(),
        "Clients:".to_string(),
    ];

    for client in clients {
        lines.push(match client {
            ClientRef::Registered { client_id } => format!("  {}", client_id),
            ClientRef::Manual {
                identifier,
                name: Some(name),
            } => format!("  {} ({})", identifier, name),
            ClientRef::Manual { identifier, .. } => format!("  {}", identifier),
        });
    }
    lines
}

fn format_duration(seconds: Option<i64>) -> String {
    match seconds {
        Some(s) => format!("{} min {} s", s / 60, s % 60),
        None => "-".to_string(),
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Text lines that fit on one A4 page at the report's leading.
const LINES_PER_PAGE: usize = 50;

fn create_report_pdf(lines: &[String]) -> Result<Vec<u8>, ReportError> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for chunk in page_chunks(lines) {
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content_stream(chunk).into_bytes(),
        ));
        // A4 in points
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ReportError::Pdf(e.to_string()))?;
    Ok(buffer)
}

/// Splits lines into pages; an empty report still gets one page.
fn page_chunks(lines: &[String]) -> Vec<&[String]> {
    if lines.is_empty() {
        return vec![lines];
    }
    lines.chunks(LINES_PER_PAGE).collect()
}

fn content_stream(lines: &[String]) -> String {
    let mut content = String::from("BT\n/F1 11 Tf\n40 800 Td\n15 TL\n");
    for line in lines {
        content.push_str(&format!("({}) Tj T*\n", escape_pdf_string(line)));
    }
    content.push_str("ET\n");
    content
}

/// Escapes PDF string delimiters. Base-14 fonts only cover ASCII, so
/// other characters are folded or blanked.
fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            c if c.is_ascii() && !c.is_control() => c.to_string(),
            c => fold_polish(c).map_or_else(|| " ".to_string(), |f| f.to_string()),
        })
        .collect()
}

fn fold_polish(c: char) -> Option<char> {
    let folded = match c {
        'ą' => 'a',
        'ć' => 'c',
        'ę' => 'e',
        'ł' => 'l',
        'ń' => 'n',
        'ó' => 'o',
        'ś' => 's',
        'ź' | 'ż' => 'z',
        'Ą' => 'A',
        'Ć' => 'C',
        'Ę' => 'E',
        'Ł' => 'L',
        'Ń' => 'N',
        'Ó' => 'O',
        'Ś' => 'S',
        'Ź' | 'Ż' => 'Z',
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{CycleStatus, CycleType};
    use chrono::{NaiveDate, Utc};
    use tempfile::TempDir;

    fn cycle() -> CycleRow {
        let day = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        CycleRow {
            id: 17,
            autoclave_id: 1,
            cycle_number: 1234,
            cycle_start_datetime: day.and_hms_opt(9, 15, 0),
            program: Some("134℃".to_string()),
            sterilization_start: day.and_hms_opt(9, 40, 10),
            sterilization_end: day.and_hms_opt(9, 44, 10),
            sterilization_duration_seconds: Some(240),
            pressure_min: Some(205.0),
            pressure_max: Some(215.0),
            temperature_min: Some(134.4),
            temperature_max: Some(136.1),
            cycle_type: CycleType::Normal,
            status: CycleStatus::Approved,
            report_file_path: None,
            generated_report_path: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_writes_pdf() {
        let dir = TempDir::new().unwrap();
        let generator = PdfReportGenerator::new(dir.path().join("protocols"));
        let clients = vec![
            ClientRef::registered("C-1"),
            ClientRef::manual("walk-in", Some("Gabinet Łódź".to_string())),
        ];

        let report = generator.generate(&cycle(), &clients).unwrap();

        assert_eq!(
            report.path,
            dir.path()
                .join("protocols")
                .join("sterilization_report_cycle_17.pdf")
        );
        assert_eq!(
            report.url,
            "/generated/sterilization/sterilization_report_cycle_17.pdf"
        );
        let bytes = std::fs::read(&report.path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(Document::load_mem(&bytes).is_ok());
    }

    #[test]
    fn test_report_lines() {
        let lines = report_lines(&cycle(), &[ClientRef::manual("m-1", None)]);
        assert!(lines.contains(&"Program: 134 C".to_string()));
        assert!(lines.contains(&"Duration: 4 min 0 s".to_string()));
        assert!(lines.contains(&"Pressure: min 205 / max 215".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("  m-1"));
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(escape_pdf_string("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape_pdf_string("Łódź"), "Lodz");
        assert_eq!(escape_pdf_string("x℃"), "x ");
    }

    #[test]
    fn test_long_client_list_continues_on_next_page() {
        let dir = TempDir::new().unwrap();
        let generator = PdfReportGenerator::new(dir.path());
        let clients: Vec<_> = (0..45)
            .map(|i| ClientRef::registered(format!("CLIENT-{:02}", i)))
            .collect();

        let report = generator.generate(&cycle(), &clients).unwrap();

        let bytes = std::fs::read(&report.path).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
        let text = String::from_utf8_lossy(&bytes);
        for i in 0..45 {
            let needle = format!("(  CLIENT-{:02}) Tj", i);
            assert!(text.contains(&needle), "missing {}", needle);
        }
    }

    #[test]
    fn test_page_chunks() {
        let lines: Vec<String> = (0..101).map(|i| i.to_string()).collect();
        let pages = page_chunks(&lines);
        assert_eq!(
            pages.iter().map(|p| p.len()).collect::<Vec<_>>(),
            vec![50, 50, 1]
        );
        assert_eq!(page_chunks(&[]).len(), 1);
    }

    #[test]
    fn test_url_prefix() {
        let dir = TempDir::new().unwrap();
        let generator = PdfReportGenerator::new(dir.path()).with_url_prefix("/files/");
        let report = generator.generate(&cycle(), &[]).unwrap();
        assert_eq!(report.url, "/files/sterilization_report_cycle_17.pdf");
    }
}

//! Builders for autoclave export fixtures.

#![allow(dead_code)]

/// Builder for a raw autoclave export.
///
/// Defaults describe a passing 134℃ cycle: four minutes of sterilization
/// at 205–215 kPa and at least 134.4 °C.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    serial: Option<String>,
    cycle_number: Option<u32>,
    date: String,
    time: String,
    program: String,
    sterilization_start: String,
    sterilization_end: String,
    pressure_max: u32,
    pressure_min: u32,
    temperature_max: String,
    temperature_min: String,
    bowie_dick: bool,
    footer: Option<String>,
}

impl ReportBuilder {
    pub fn new(serial: &str, cycle_number: u32) -> Self {
        Self {
            serial: Some(serial.to_string()),
            cycle_number: Some(cycle_number),
            date: "05-03-2026".to_string(),
            time: "09:15:02".to_string(),
            program: "134℃".to_string(),
            sterilization_start: "09:40:10".to_string(),
            sterilization_end: "09:44:10".to_string(),
            pressure_max: 215,
            pressure_min: 205,
            temperature_max: "136.1".to_string(),
            temperature_min: "134.4".to_string(),
            bowie_dick: false,
            footer: Some("Koniec".to_string()),
        }
    }

    pub fn without_serial(mut self) -> Self {
        self.serial = None;
        self
    }

    pub fn date(mut self, date: &str) -> Self {
        self.date = date.to_string();
        self
    }

    pub fn program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    pub fn phase(mut self, start: &str, end: &str) -> Self {
        self.sterilization_start = start.to_string();
        self.sterilization_end = end.to_string();
        self
    }

    pub fn pressure_min(mut self, kpa: u32) -> Self {
        self.pressure_min = kpa;
        self
    }

    pub fn temperature_max(mut self, celsius: &str) -> Self {
        self.temperature_max = celsius.to_string();
        self
    }

    pub fn temperature_min(mut self, celsius: &str) -> Self {
        self.temperature_min = celsius.to_string();
        self
    }

    /// Adds the Bowie-Dick test marker to the body.
    pub fn bowie_dick(mut self) -> Self {
        self.bowie_dick = true;
        self
    }

    /// Drops the termination footer, as in an interrupted cycle.
    pub fn truncated(mut self) -> Self {
        self.footer = None;
        self
    }

    pub fn text(&self) -> String {
        let mut lines = vec!["Autoklaw klasy B".to_string()];
        if let Some(serial) = &self.serial {
            lines.push(format!("Nr seryjny:{}", serial));
        }
        if let Some(number) = self.cycle_number {
            lines.push(format!("Ilość:{}", number));
        }
        lines.push(format!("Data:{}", self.date));
        lines.push(format!("Czas:{}", self.time));
        lines.push(format!("Program:{}", self.program));
        if self.bowie_dick {
            lines.push("B-D test".to_string());
        }
        lines.push("Start sterylizacji".to_string());
        lines.push(format!("  {}", self.sterilization_start));
        lines.push("Koniec sterylizacji".to_string());
        lines.push(format!("  {}", self.sterilization_end));
        lines.push(format!("Maks ciśnienie: {}", self.pressure_max));
        lines.push(format!("Min ciśnienie: {}", self.pressure_min));
        lines.push(format!("Maks temp: {}", self.temperature_max));
        lines.push(format!("Min temp: {}", self.temperature_min));
        if let Some(footer) = &self.footer {
            lines.push(footer.clone());
        }
        lines.join("\r\n") + "\r\n"
    }

    /// UTF-16LE bytes with a leading byte order mark.
    pub fn build(&self) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(self.text().encode_utf16().flat_map(|u| u.to_le_bytes()));
        bytes
    }
}

use super::OutputFormatter;
use crate::report::{ReportLine, ScanOutcome};

pub struct JsonFormatter {
    pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    fn to_json<T: serde::Serialize + ?Sized>(&self, value: &T) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value)
                .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        } else {
            serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        }
    }
}

impl OutputFormatter for JsonFormatter {
    /// One compact object per line so verbose output stays line-delimited.
    fn format_line(&self, line: &ReportLine) -> String {
        serde_json::to_string(line).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }

    fn format_outcome(&self, outcome: &ScanOutcome) -> String {
        self.to_json(outcome)
    }
}

use colored::Colorize;

use super::OutputFormatter;
use crate::classify::CertStatus;
use crate::colors::CatppuccinExt;
use crate::report::{ReportLine, ScanOutcome};

pub struct HumanFormatter {
    use_colors: bool,
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    fn label(&self, text: &str) -> String {
        if self.use_colors {
            text.sky().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn value(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_white().to_string()
        } else {
            text.to_string()
        }
    }

    fn muted(&self, text: &str) -> String {
        if self.use_colors {
            text.overlay1().to_string()
        } else {
            text.to_string()
        }
    }

    fn status(&self, text: &str, status: CertStatus) -> String {
        if self.use_colors {
            text.by_status(status).bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn header(&self, text: &str) -> String {
        if self.use_colors {
            format!("\n{}\n{}", text.lavender().bold(), "─".repeat(text.len()).overlay1())
        } else {
            format!("\n{}\n{}", text, "-".repeat(text.len()))
        }
    }

    fn count(&self, label: &str, count: usize, status: Option<CertStatus>) -> String {
        let count = count.to_string();
        let count = match status {
            Some(status) if count != "0" => self.status(&count, status),
            _ => self.value(&count),
        };
        format!("  {} {}", self.label(&format!("{}:", label)), count)
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_line(&self, line: &ReportLine) -> String {
        let status = line.status();
        format!(
            "{} {}, {}, {}",
            self.value(&line.hostname),
            self.muted(&format!("({})", line.address_display())),
            self.value(&line.classification.display_date()),
            self.status(&status.to_string(), status)
        )
    }

    fn format_outcome(&self, outcome: &ScanOutcome) -> String {
        let summary = &outcome.summary;
        let mut output = Vec::new();

        output.push(self.header(&format!("Certificate scan: {}", outcome.domain)));
        output.push(self.count("Total", summary.total, None));
        output.push(self.count("Expired", summary.expired, Some(CertStatus::Expired)));
        output.push(self.count("Active", summary.active, Some(CertStatus::Active)));
        output.push(self.count(
            "Unreachable",
            summary.unreachable,
            Some(CertStatus::Unreachable),
        ));

        if outcome.interrupted {
            output.push(format!(
                "  {}",
                self.status("Interrupted: counts cover completed hosts only", CertStatus::Unreachable)
            ));
        }

        output.push(format!(
            "  {} {}",
            self.label("Report saved to:"),
            self.value(&outcome.report_path.display().to_string())
        ));

        output.join("\n")
    }
}

//! Catppuccin-inspired palette for certificate status output.
//!
//! Uses standard ANSI bright colors for maximum terminal compatibility.

use colored::{ColoredString, Colorize};

use crate::classify::CertStatus;

/// Extension trait applying the scan palette to strings.
pub trait CatppuccinExt {
    fn ctp_red(&self) -> ColoredString;
    fn ctp_yellow(&self) -> ColoredString;
    fn ctp_green(&self) -> ColoredString;
    fn sky(&self) -> ColoredString;
    fn lavender(&self) -> ColoredString;
    fn ctp_white(&self) -> ColoredString;
    fn overlay1(&self) -> ColoredString;

    /// Color a string by the certificate status it describes.
    fn by_status(&self, status: CertStatus) -> ColoredString {
        match status {
            CertStatus::Active => self.ctp_green(),
            CertStatus::Expired => self.ctp_red(),
            CertStatus::Unreachable => self.ctp_yellow(),
        }
    }
}

impl<S: AsRef<str>> CatppuccinExt for S {
    fn ctp_red(&self) -> ColoredString {
        self.as_ref().bright_red()
    }

    fn ctp_yellow(&self) -> ColoredString {
        self.as_ref().bright_yellow()
    }

    fn ctp_green(&self) -> ColoredString {
        self.as_ref().bright_green()
    }

    // Sky -> bright cyan
    fn sky(&self) -> ColoredString {
        self.as_ref().bright_cyan()
    }

    // Lavender -> bright purple
    fn lavender(&self) -> ColoredString {
        self.as_ref().bright_purple()
    }

    fn ctp_white(&self) -> ColoredString {
        self.as_ref().bright_white()
    }

    // Overlay1 -> gray
    fn overlay1(&self) -> ColoredString {
        self.as_ref().bright_black()
    }
}

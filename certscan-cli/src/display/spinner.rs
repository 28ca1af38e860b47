use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use super::progress::SpinnerSlot;

/// Spinner counting finished hosts while the scan runs without `--verbose`.
pub struct Spinner {
    progress: ProgressBar,
    slot: SpinnerSlot,
}

impl Spinner {
    pub fn new(slot: &SpinnerSlot, message: &str) -> Self {
        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner:.cyan} {msg} {pos} checked ({elapsed})")
                .expect("static spinner template"),
        );
        progress.set_message(message.to_string());
        progress.enable_steady_tick(Duration::from_millis(80));
        slot.attach(progress.clone());

        Self {
            progress,
            slot: slot.clone(),
        }
    }

    /// Handle for bumping the count from the scan callback.
    pub fn handle(&self) -> ProgressBar {
        self.progress.clone()
    }

    pub fn finish(&self) {
        self.slot.detach();
        self.progress.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.finish();
    }
}

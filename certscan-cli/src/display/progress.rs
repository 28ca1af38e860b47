//! Keeps log output from tearing the scan spinner.
//!
//! The subscriber is installed before any spinner exists, so both hold the
//! same [`SpinnerSlot`]. While a spinner sits in the slot, complete log lines
//! are printed above it; otherwise they go straight to stderr.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use indicatif::ProgressBar;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
pub struct SpinnerSlot {
    active: Arc<Mutex<Option<ProgressBar>>>,
}

impl SpinnerSlot {
    pub fn attach(&self, spinner: ProgressBar) {
        *self.lock() = Some(spinner);
    }

    pub fn detach(&self) {
        *self.lock() = None;
    }

    fn current(&self) -> Option<ProgressBar> {
        self.lock().clone()
    }

    // A panic while logging must not silence every later log line.
    fn lock(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<'a> MakeWriter<'a> for SpinnerSlot {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            slot: self.clone(),
            pending: Vec::new(),
        }
    }
}

/// One event's worth of formatted log output.
pub struct LogWriter {
    slot: SpinnerSlot,
    pending: Vec<u8>,
}

impl LogWriter {
    fn emit(&self, line: &str) -> io::Result<()> {
        match self.slot.current() {
            Some(spinner) => {
                spinner.println(line);
                Ok(())
            }
            None => writeln!(io::stderr(), "{}", line),
        }
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        for line in take_complete_lines(&mut self.pending) {
            self.emit(&line)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let rest = String::from_utf8_lossy(&self.pending).trim_end().to_string();
        self.pending.clear();
        if rest.is_empty() {
            Ok(())
        } else {
            self.emit(&rest)
        }
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Remove every newline-terminated line from `pending`, leaving any partial tail.
fn take_complete_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let Some(last) = pending.iter().rposition(|&b| b == b'\n') else {
        return Vec::new();
    };

    let complete: Vec<u8> = pending.drain(..=last).collect();
    String::from_utf8_lossy(&complete)
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect()
}

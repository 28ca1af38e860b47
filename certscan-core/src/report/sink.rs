use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::types::{ReportLine, ScanSummary};
use crate::error::{Result, ScanError};

const RULE_WIDTH: usize = 64;

/// Append-only text report for one scan.
///
/// Each appended line is flushed and synced before `append` returns, so a
/// crashed or interrupted scan still leaves every finished host on disk.
/// The sink is the only place counts are kept: `close` writes exactly what
/// was appended.
#[derive(Debug)]
pub struct ReportSink {
    path: PathBuf,
    file: File,
    summary: ScanSummary,
}

impl ReportSink {
    /// Create the report file (and missing parent directories) and write the header.
    pub async fn open(
        path: impl AsRef<Path>,
        domain: &str,
        scan_time: DateTime<Utc>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ScanError::report(parent, e))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .await
            .map_err(|e| ScanError::report(&path, e))?;

        let mut sink = Self {
            path,
            file,
            summary: ScanSummary::default(),
        };

        let header = format!(
            "SSL Certificate Expiration Report for {} - {}\n{}\n",
            domain,
            scan_time.format("%Y-%m-%d %H:%M:%S UTC"),
            "=".repeat(RULE_WIDTH)
        );
        if let Err(e) = sink.write_durable(&header).await {
            discard(&sink.path).await;
            return Err(e);
        }

        debug!(path = %sink.path.display(), "Report opened");
        Ok(sink)
    }

    pub async fn append(&mut self, line: &ReportLine) -> Result<()> {
        self.write_durable(&format!("{}\n", line)).await?;
        self.summary.record(line.status());
        Ok(())
    }

    /// Write the summary footer and return the final counts.
    pub async fn close(mut self, interrupted: bool) -> Result<ScanSummary> {
        let summary = self.summary;

        let mut footer = format!(
            "\nSummary:\n\
             Total subdomains processed: {}\n\
             Expired certificates: {}\n\
             Active certificates: {}\n\
             Unreachable: {}\n",
            summary.total, summary.expired, summary.active, summary.unreachable
        );
        if interrupted {
            footer.push_str("Scan interrupted: counts cover completed hosts only\n");
        }
        footer.push_str(&format!("Report saved to: {}\n", self.path.display()));

        self.write_durable(&footer).await?;
        debug!(path = %self.path.display(), total = summary.total, "Report closed");
        Ok(summary)
    }

    pub fn summary(&self) -> ScanSummary {
        self.summary
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_durable(&mut self, text: &str) -> Result<()> {
        let path = &self.path;
        self.file
            .write_all(text.as_bytes())
            .await
            .map_err(|e| ScanError::report(path, e))?;
        self.file
            .flush()
            .await
            .map_err(|e| ScanError::report(path, e))?;
        self.file
            .sync_data()
            .await
            .map_err(|e| ScanError::report(path, e))
    }
}

/// Remove a report that never received its header. Only regular files are removed.
async fn discard(path: &Path) {
    match fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => {
            if let Err(e) = fs::remove_file(path).await {
                debug!(path = %path.display(), error = %e, "Could not remove incomplete report");
            }
        }
        _ => {}
    }
}

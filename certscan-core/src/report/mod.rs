//! Streaming scan reports

mod sink;
mod types;

pub use sink::ReportSink;
pub use types::{ReportLine, ScanOutcome, ScanSummary};

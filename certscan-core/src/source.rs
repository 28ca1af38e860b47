//! Subdomain sources
//!
//! Enumeration itself happens elsewhere. These adapters turn whatever a
//! producer emits (a file, stdin, an enumeration tool's stdout) into the
//! lazy hostname stream the scanner consumes.

use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::process::Stdio;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{Result, ScanError};
use crate::validation::is_valid_hostname;

pub type HostnameStream = BoxStream<'static, String>;

/// Placeholder replaced by the root domain in enumeration commands.
pub const DOMAIN_PLACEHOLDER: &str = "{domain}";

/// Clean one line of enumeration output.
///
/// Blank lines and `#` comments are dropped, CSV input contributes its first
/// column, wildcard entries (`*.example.com`) are reduced to their base name
/// and anything that is not a valid hostname is discarded.
pub fn parse_hostname(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let first = line.split(',').next().unwrap_or(line).trim();
    let hostname = first
        .strip_prefix("*.")
        .unwrap_or(first)
        .trim_end_matches('.')
        .to_lowercase();

    if is_valid_hostname(&hostname) {
        Some(hostname)
    } else {
        debug!(line = %line, "Skipping invalid hostname");
        None
    }
}

/// Stream an in-memory list as is, blanks included.
pub fn from_list<I>(hostnames: I) -> HostnameStream
where
    I: IntoIterator<Item = String>,
    I::IntoIter: Send + 'static,
{
    stream::iter(hostnames).boxed()
}

/// Stream hostnames from a file, one per line.
pub async fn from_file(path: impl AsRef<Path>) -> Result<HostnameStream> {
    let path = path.as_ref();
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| ScanError::SourceFailed(format!("{}: {}", path.display(), e)))?;

    Ok(reader_hostnames(BufReader::new(file)))
}

/// Stream hostnames piped into this process.
pub fn from_stdin() -> HostnameStream {
    reader_hostnames(BufReader::new(tokio::io::stdin()))
}

/// Run an enumeration command and stream its stdout.
///
/// The command line is split on whitespace (no shell involved) and every
/// `{domain}` is replaced with `domain`. The child is killed if the stream
/// is dropped early.
pub fn from_command(command_line: &str, domain: &str) -> Result<HostnameStream> {
    let mut parts = command_line
        .split_whitespace()
        .map(|part| part.replace(DOMAIN_PLACEHOLDER, domain));
    let program = parts
        .next()
        .ok_or_else(|| ScanError::SourceFailed("empty enumeration command".to_string()))?;

    let mut child = Command::new(&program)
        .args(parts)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ScanError::SourceFailed(format!("{}: {}", program, e)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ScanError::SourceFailed(format!("{}: no stdout", program)))?;

    debug!(program = %program, "Enumeration command started");

    let reader = BufReader::new(stdout);
    let stream = stream::unfold(Some((reader, child)), |state| async move {
        let (mut reader, mut child) = state?;
        loop {
            match next_line_lossy(&mut reader).await {
                Ok(Some(line)) => {
                    if let Some(hostname) = parse_hostname(&line) {
                        return Some((hostname, Some((reader, child))));
                    }
                }
                Ok(None) => {
                    reap(&mut child).await;
                    return None;
                }
                Err(e) => {
                    warn!(error = %e, "Reading enumeration output failed");
                    reap(&mut child).await;
                    return None;
                }
            }
        }
    });

    Ok(stream.boxed())
}

/// Drop repeated hostnames, keeping the first occurrence.
pub fn unique(hostnames: HostnameStream) -> HostnameStream {
    let mut seen = HashSet::new();
    hostnames
        .filter(move |hostname| future::ready(seen.insert(hostname.clone())))
        .boxed()
}

fn reader_hostnames<R>(reader: R) -> HostnameStream
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    stream::unfold(reader, |mut reader| async move {
        loop {
            match next_line_lossy(&mut reader).await {
                Ok(Some(line)) => {
                    if let Some(hostname) = parse_hostname(&line) {
                        return Some((hostname, reader));
                    }
                }
                Ok(None) => return None,
                Err(e) => {
                    warn!(error = %e, "Reading hostnames failed");
                    return None;
                }
            }
        }
    })
    .boxed()
}

/// Read one line, replacing invalid UTF-8 instead of failing on it.
/// Only real I/O errors end the stream; a garbled line is dropped by `parse_hostname`.
async fn next_line_lossy<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

async fn reap(child: &mut Child) {
    match child.wait().await {
        Ok(status) if !status.success() => {
            warn!(status = %status, "Enumeration command exited unsuccessfully")
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Enumeration command could not be awaited"),
    }
}

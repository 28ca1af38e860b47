use std::future::Future;
use std::path::Path;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use futures::future;
use futures::stream::{Stream, StreamExt};
use tracing::{debug, info, instrument};

use crate::classify::{classify, Classification};
use crate::dns::{DnsResolver, HostResolver};
use crate::error::{Result, ScanError};
use crate::probe::{CertificateProbe, CertificateProber};
use crate::report::{ReportLine, ReportSink, ScanOutcome};
use crate::validation::normalize_domain;

pub type LineCallback = Box<dyn Fn(&ReportLine) + Send + Sync>;

pub const DEFAULT_CONCURRENCY: usize = 10;

/// Drives resolve → probe → classify → report for every hostname of a scan.
///
/// Up to `concurrency` hosts are in flight at once. Finished hosts come back
/// in source order and are appended by the scan loop alone, so the report
/// needs no locking.
pub struct Scanner<R = DnsResolver, P = CertificateProbe> {
    concurrency: usize,
    resolver: R,
    prober: P,
}

impl<R, P> Scanner<R, P>
where
    R: HostResolver,
    P: CertificateProber,
{
    pub fn new(resolver: R, prober: P) -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            resolver,
            prober,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Scan every hostname the source yields and write the report to `report_path`.
    pub async fn run<S>(
        &self,
        domain: &str,
        hostnames: S,
        report_path: &Path,
        on_line: Option<LineCallback>,
    ) -> Result<ScanOutcome>
    where
        S: Stream<Item = String>,
    {
        self.run_until(domain, hostnames, report_path, on_line, future::pending::<()>())
            .await
    }

    /// Like [`run`](Self::run), but stops dispatching new hosts once `shutdown`
    /// completes. Hosts already in flight are finished and reported.
    pub async fn run_until<S, F>(
        &self,
        domain: &str,
        hostnames: S,
        report_path: &Path,
        on_line: Option<LineCallback>,
        shutdown: F,
    ) -> Result<ScanOutcome>
    where
        S: Stream<Item = String>,
        F: Future<Output = ()>,
    {
        let domain = normalize_domain(domain)?;

        let hostnames = hostnames
            .map(|hostname| hostname.trim().to_string())
            .filter(|hostname| future::ready(!hostname.is_empty()));
        let mut hostnames = pin!(hostnames.peekable());

        // Nothing is written until the source has produced at least one host.
        if hostnames.as_mut().peek().await.is_none() {
            return Err(ScanError::NoSubdomains(domain));
        }

        let started_at = Utc::now();
        let mut sink = ReportSink::open(report_path, &domain, started_at).await?;

        info!(
            domain = %domain,
            concurrency = self.concurrency,
            report = %report_path.display(),
            "Starting certificate scan"
        );

        let interrupted = AtomicBool::new(false);
        let shutdown = async {
            shutdown.await;
            interrupted.store(true, Ordering::Relaxed);
            debug!("Shutdown requested, no further hosts will be dispatched");
        };

        let mut lines = pin!(hostnames
            .take_until(shutdown)
            .map(|hostname| self.inspect(hostname))
            .buffered(self.concurrency));

        while let Some(line) = lines.next().await {
            sink.append(&line).await?;
            if let Some(on_line) = &on_line {
                on_line(&line);
            }
        }

        let interrupted = interrupted.load(Ordering::Relaxed);
        let summary = sink.close(interrupted).await?;

        info!(
            total = summary.total,
            expired = summary.expired,
            active = summary.active,
            unreachable = summary.unreachable,
            interrupted,
            "Certificate scan finished"
        );

        Ok(ScanOutcome {
            domain,
            started_at,
            report_path: report_path.to_path_buf(),
            summary,
            interrupted,
        })
    }

    #[instrument(skip(self))]
    async fn inspect(&self, hostname: String) -> ReportLine {
        let address = self.resolver.resolve(&hostname).await;
        let classification = match address {
            Some(ip) => classify(&self.prober.probe(&hostname, Some(ip)).await, Utc::now()),
            None => {
                debug!("Resolution failed, skipping probe");
                Classification::unreachable()
            }
        };

        debug!(status = %classification.status, "Host classified");

        ReportLine {
            hostname,
            address,
            classification,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::CertStatus;
    use crate::probe::{ProbeOptions, ProbeResult};
    use crate::report::ScanSummary;
    use crate::source::from_list;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone};
    use std::collections::{HashMap, HashSet};
    use std::net::IpAddr;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeResolver {
        addresses: HashMap<String, IpAddr>,
    }

    impl FakeResolver {
        fn with(mut self, hostname: &str, address: &str) -> Self {
            self.addresses
                .insert(hostname.to_string(), address.parse().unwrap());
            self
        }
    }

    #[async_trait]
    impl HostResolver for FakeResolver {
        async fn resolve(&self, hostname: &str) -> Option<IpAddr> {
            self.addresses.get(hostname).copied()
        }
    }

    /// Answers from a table, `Timeout` for unknown hosts, and tracks parallelism.
    #[derive(Default)]
    struct FakeProber {
        results: HashMap<String, ProbeResult>,
        delay: Option<Duration>,
        calls: Arc<AtomicUsize>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    impl FakeProber {
        fn with(mut self, hostname: &str, result: ProbeResult) -> Self {
            self.results.insert(hostname.to_string(), result);
            self
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl CertificateProber for FakeProber {
        async fn probe(&self, hostname: &str, _address: Option<IpAddr>) -> ProbeResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                // Vary completion order so out-of-order finishes are exercised.
                let jitter = hostname.len() as u32 % 5;
                tokio::time::sleep(delay * (jitter + 1)).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.results
                .get(hostname)
                .copied()
                .unwrap_or(ProbeResult::Timeout)
        }
    }

    fn hosts(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn expired_on_new_year() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    /// Host lines between the header rule and the summary block.
    fn body_lines(content: &str) -> Vec<String> {
        content
            .lines()
            .skip(2)
            .take_while(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_expired_host_line_and_summary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let scanner = Scanner::new(
            FakeResolver::default().with("a.example.com", "1.2.3.4"),
            FakeProber::default().with("a.example.com", ProbeResult::Success(expired_on_new_year())),
        );

        let outcome = scanner
            .run("example.com", from_list(hosts(&["a.example.com"])), &path, None)
            .await
            .unwrap();

        assert_eq!(
            outcome.summary,
            ScanSummary {
                total: 1,
                expired: 1,
                active: 0,
                unreachable: 0
            }
        );
        assert!(!outcome.interrupted);
        assert_eq!(outcome.domain, "example.com");
        assert_eq!(outcome.report_path, path);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("SSL Certificate Expiration Report for example.com - "));
        assert_eq!(
            body_lines(&content),
            vec!["a.example.com (1.2.3.4), 2024-01-01, Expired"]
        );
    }

    #[tokio::test]
    async fn test_unresolved_host_line_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let scanner = Scanner::new(
            FakeResolver::default(),
            FakeProber::default().with("b.example.com", ProbeResult::Timeout),
        );

        let outcome = scanner
            .run("example.com", from_list(hosts(&["b.example.com"])), &path, None)
            .await
            .unwrap();

        assert_eq!(outcome.summary.unreachable, 1);
        assert_eq!(outcome.summary.total, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            body_lines(&content),
            vec!["b.example.com (), N/A, Unreachable"]
        );
    }

    #[tokio::test]
    async fn test_unresolved_host_is_unreachable_without_probing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let expiry = Utc::now() + ChronoDuration::days(30);
        let prober = FakeProber::default().with("v6only.example.com", ProbeResult::Success(expiry));
        let calls = prober.calls.clone();
        let scanner = Scanner::new(FakeResolver::default(), prober);

        let outcome = scanner
            .run("example.com", from_list(hosts(&["v6only.example.com"])), &path, None)
            .await
            .unwrap();

        assert_eq!(outcome.summary.unreachable, 1);
        assert_eq!(outcome.summary.active, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            body_lines(&content),
            vec!["v6only.example.com (), N/A, Unreachable"]
        );
    }

    #[tokio::test]
    async fn test_blank_entries_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let expiry = Utc::now() + ChronoDuration::days(30);
        let scanner = Scanner::new(
            FakeResolver::default().with("c.example.com", "10.0.0.3"),
            FakeProber::default().with("c.example.com", ProbeResult::Success(expiry)),
        );

        let outcome = scanner
            .run(
                "example.com",
                from_list(hosts(&["", "c.example.com", "   "])),
                &path,
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome.summary.total, 1);
        assert_eq!(outcome.summary.active, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body_lines(&content).len(), 1);
    }

    #[tokio::test]
    async fn test_empty_source_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports").join("report.txt");
        let prober = FakeProber::default();
        let calls = prober.calls.clone();
        let scanner = Scanner::new(FakeResolver::default(), prober);

        for input in [hosts(&[]), hosts(&["", "  ", "\t"])] {
            let err = scanner
                .run("example.com", from_list(input), &path, None)
                .await
                .unwrap_err();
            assert!(matches!(err, ScanError::NoSubdomains(ref d) if d == "example.com"));
        }

        assert!(!path.exists());
        assert!(!dir.path().join("reports").exists());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_domain_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let scanner = Scanner::new(FakeResolver::default(), FakeProber::default());

        let err = scanner
            .run("", from_list(hosts(&["a.example.com"])), &path, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidDomain(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_parallel_scan_reports_each_host_once_in_order() {
        let dir = tempdir().unwrap();
        let names: Vec<String> = (0..120).map(|i| format!("host{}.example.com", i)).collect();

        let mut prober = FakeProber::default().delayed(Duration::from_millis(2));
        let mut resolver = FakeResolver::default();
        for (i, name) in names.iter().enumerate() {
            let result = match i % 3 {
                0 => ProbeResult::Success(Utc::now() + ChronoDuration::days(60)),
                1 => ProbeResult::Success(expired_on_new_year()),
                _ => ProbeResult::ConnectionFailed,
            };
            prober = prober.with(name, result);
            resolver = resolver.with(name, "192.0.2.10");
        }
        let max_in_flight = prober.max_in_flight.clone();

        for concurrency in [1, 4, 16] {
            let path = dir.path().join(format!("report-{}.txt", concurrency));
            let scanner = Scanner::new(
                FakeResolver {
                    addresses: resolver.addresses.clone(),
                },
                FakeProber {
                    results: prober.results.clone(),
                    delay: prober.delay,
                    max_in_flight: max_in_flight.clone(),
                    ..FakeProber::default()
                },
            )
            .with_concurrency(concurrency);
            max_in_flight.store(0, Ordering::SeqCst);

            let outcome = scanner
                .run("example.com", from_list(names.clone()), &path, None)
                .await
                .unwrap();

            assert_eq!(outcome.summary.total, names.len());
            assert_eq!(outcome.summary.active, 40);
            assert_eq!(outcome.summary.expired, 40);
            assert_eq!(outcome.summary.unreachable, 40);
            assert!(outcome.summary.is_consistent());
            assert!(max_in_flight.load(Ordering::SeqCst) <= concurrency);

            let content = std::fs::read_to_string(&path).unwrap();
            let reported: Vec<String> = body_lines(&content)
                .iter()
                .map(|line| line.split(' ').next().unwrap().to_string())
                .collect();
            assert_eq!(reported, names);
            assert_eq!(reported.iter().collect::<HashSet<_>>().len(), names.len());
        }
    }

    #[tokio::test]
    async fn test_line_callback_sees_every_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let collected = seen.clone();
        let on_line: LineCallback = Box::new(move |line: &ReportLine| {
            collected.lock().unwrap().push(line.clone());
        });

        let scanner = Scanner::new(FakeResolver::default(), FakeProber::default());
        let outcome = scanner
            .run(
                "example.com",
                from_list(hosts(&["a.example.com", "b.example.com"])),
                &path,
                Some(on_line),
            )
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(ScanSummary::tally(seen.iter()), outcome.summary);
        assert!(seen.iter().all(|line| line.status() == CertStatus::Unreachable));
    }

    #[tokio::test]
    async fn test_shutdown_before_start_reports_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let scanner = Scanner::new(FakeResolver::default(), FakeProber::default());

        let outcome = scanner
            .run_until(
                "example.com",
                from_list(hosts(&["a.example.com", "b.example.com"])),
                &path,
                None,
                future::ready(()),
            )
            .await
            .unwrap();

        assert!(outcome.interrupted);
        assert_eq!(outcome.summary.total, 0);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(body_lines(&content).is_empty());
        assert!(content.contains("Scan interrupted"));
        assert!(content.contains("Total subdomains processed: 0\n"));
    }

    #[tokio::test]
    async fn test_shutdown_mid_scan_keeps_finished_hosts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let tx = Mutex::new(Some(tx));
        let on_line: LineCallback = Box::new(move |_line: &ReportLine| {
            if let Some(tx) = tx.lock().unwrap().take() {
                let _ = tx.send(());
            }
        });

        let names: Vec<String> = (0..20).map(|i| format!("h{}.example.com", i)).collect();
        let resolver = names
            .iter()
            .fold(FakeResolver::default(), |resolver, name| resolver.with(name, "192.0.2.20"));
        let scanner = Scanner::new(
            resolver,
            FakeProber::default().delayed(Duration::from_millis(5)),
        )
        .with_concurrency(1);

        let outcome = scanner
            .run_until(
                "example.com",
                from_list(names.clone()),
                &path,
                Some(on_line),
                async move {
                    let _ = rx.await;
                },
            )
            .await
            .unwrap();

        assert!(outcome.interrupted);
        assert!(outcome.summary.total >= 1);
        assert!(outcome.summary.total < names.len());

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body_lines(&content).len(), outcome.summary.total);
        assert!(content.contains(&format!(
            "Total subdomains processed: {}\n",
            outcome.summary.total
        )));
    }

    #[tokio::test]
    async fn test_hung_host_does_not_stall_scan() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let dir = tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let prober = CertificateProbe::with_options(
            ProbeOptions::new()
                .with_port(port)
                .with_timeout(Duration::from_millis(200)),
        )
        .unwrap();
        let scanner = Scanner::new(
            FakeResolver::default()
                .with("slow1.example.com", "127.0.0.1")
                .with("slow2.example.com", "127.0.0.1"),
            prober,
        )
        .with_concurrency(2);

        let started = Instant::now();
        let outcome = scanner
            .run(
                "example.com",
                from_list(hosts(&["slow1.example.com", "slow2.example.com"])),
                &path,
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome.summary.unreachable, 2);
        assert!(started.elapsed() < Duration::from_secs(3));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            body_lines(&content),
            vec![
                "slow1.example.com (127.0.0.1), N/A, Unreachable",
                "slow2.example.com (127.0.0.1), N/A, Unreachable",
            ]
        );
    }
}

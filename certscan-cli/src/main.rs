mod display;

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use certscan_core::colors::CatppuccinExt;
use certscan_core::output::{get_formatter, OutputFormat, OutputFormatter};
use certscan_core::scan::DEFAULT_CONCURRENCY;
use certscan_core::source::{self, HostnameStream};
use certscan_core::{
    CertificateProbe, DnsResolver, LineCallback, ProbeOptions, ReportLine, Scanner,
};
use chrono::Utc;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use display::progress::SpinnerSlot;
use display::spinner::Spinner;

/// Default enumeration tool invocation; `{domain}` is replaced with the root domain.
const DEFAULT_ENUM_CMD: &str = "subfinder -d {domain} -silent";

/// Exit status after Ctrl-C, following the shell convention for SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Parser)]
#[command(name = "certscan")]
#[command(about = "Enumerate subdomains and report their SSL certificate expiration status")]
#[command(version)]
struct Cli {
    /// Root domain to scan (e.g., example.com)
    domain: String,

    /// Read hostnames from a file instead of running the enumeration command ("-" for stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Enumeration command whose stdout lists one hostname per line
    #[arg(long, default_value = DEFAULT_ENUM_CMD)]
    enum_cmd: String,

    /// Report file (default: <domain>_ssl_report_<timestamp>.txt)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TLS connect + handshake timeout per host, in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    timeout: u64,

    /// DNS lookup timeout per host, in milliseconds
    #[arg(long, default_value_t = 2000)]
    dns_timeout: u64,

    /// Number of hosts probed in parallel
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// TLS port to probe
    #[arg(long, default_value_t = 443)]
    port: u16,

    /// Validate certificate chains (untrusted hosts are then reported unreachable)
    #[arg(long)]
    verify: bool,

    /// Nameserver to query instead of the system resolver (e.g., 8.8.8.8)
    #[arg(long)]
    nameserver: Option<IpAddr>,

    /// Print every host result as it completes
    #[arg(short, long)]
    verbose: bool,

    /// Summary format (human or json)
    #[arg(short, long, default_value = "human")]
    format: String,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let spinner_slot = SpinnerSlot::default();
    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(spinner_slot.clone())
        .init();

    let output_format: OutputFormat = cli.format.parse().unwrap_or_default();

    match execute_scan(cli, output_format, &spinner_slot).await {
        Ok(true) => std::process::exit(INTERRUPTED_EXIT_CODE),
        Ok(false) => Ok(()),
        Err(e) => {
            eprintln!("{} {}", "Error:".ctp_red(), e);
            std::process::exit(1);
        }
    }
}

/// Runs the scan and prints the summary. Returns whether it was interrupted.
async fn execute_scan(
    cli: Cli,
    output_format: OutputFormat,
    spinner_slot: &SpinnerSlot,
) -> anyhow::Result<bool> {
    let domain = certscan_core::normalize_domain(&cli.domain)?;
    let hostnames = open_source(&cli, &domain).await?;
    let report_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_report_path(&domain));

    let mut resolver = DnsResolver::new().with_timeout(Duration::from_millis(cli.dns_timeout));
    if let Some(nameserver) = cli.nameserver {
        resolver = resolver.with_nameserver(nameserver);
    }

    let prober = CertificateProbe::with_options(
        ProbeOptions::new()
            .with_timeout(Duration::from_millis(cli.timeout))
            .with_port(cli.port)
            .with_verify_chain(cli.verify),
    )?;

    let scanner = Scanner::new(resolver, prober).with_concurrency(cli.concurrency);
    let formatter: Arc<dyn OutputFormatter + Send + Sync> = Arc::from(get_formatter(output_format));

    let spinner =
        (!cli.verbose).then(|| Spinner::new(spinner_slot, &format!("Scanning {}", domain)));
    let on_line: LineCallback = match &spinner {
        Some(spinner) => {
            let progress = spinner.handle();
            Box::new(move |_line: &ReportLine| progress.inc(1))
        }
        None => {
            let formatter = formatter.clone();
            Box::new(move |line: &ReportLine| println!("{}", formatter.format_line(line)))
        }
    };

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // Without a signal handler the scan simply runs to completion.
            std::future::pending::<()>().await;
        }
    };

    let outcome = scanner
        .run_until(&domain, hostnames, &report_path, Some(on_line), shutdown)
        .await;

    if let Some(spinner) = spinner {
        spinner.finish();
    }
    let outcome = outcome?;

    println!("{}", formatter.format_outcome(&outcome));
    Ok(outcome.interrupted)
}

async fn open_source(cli: &Cli, domain: &str) -> certscan_core::Result<HostnameStream> {
    let hostnames = match &cli.input {
        Some(path) if path.as_os_str() == "-" => {
            debug!("Reading hostnames from stdin");
            source::from_stdin()
        }
        Some(path) => {
            debug!(path = %path.display(), "Reading hostnames from file");
            source::from_file(path).await?
        }
        None => {
            debug!(command = %cli.enum_cmd, "Running enumeration command");
            source::from_command(&cli.enum_cmd, domain)?
        }
    };

    Ok(source::unique(hostnames))
}

fn default_report_path(domain: &str) -> PathBuf {
    Path::new(".").join(format!(
        "{}_ssl_report_{}.txt",
        domain,
        Utc::now().format("%Y%m%d_%H%M%S")
    ))
}

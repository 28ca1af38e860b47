use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::system_conf::read_system_conf;
use hickory_resolver::TokioAsyncResolver;
use tracing::{debug, instrument};

/// Default upper bound for a single hostname resolution (2 seconds).
/// Subdomain lists are long; a slow nameserver must not hold up the scan.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Maps a hostname to a representative address.
///
/// Implementations never fail: every problem (NXDOMAIN, SERVFAIL, timeout,
/// no A record) is reported as `None`.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, hostname: &str) -> Option<IpAddr>;
}

/// DNS resolver returning the first A record of a hostname.
///
/// Uses the system resolver configuration when it can be read, Google DNS
/// otherwise, or a single explicit nameserver when one is configured.
#[derive(Clone)]
pub struct DnsResolver {
    timeout: Duration,
    nameserver: Option<IpAddr>,
    resolver: TokioAsyncResolver,
}

impl Default for DnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsResolver {
    /// Creates a resolver with the default 2 second timeout.
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            nameserver: None,
            resolver: build_resolver(DEFAULT_TIMEOUT, None),
        }
    }

    /// Sets the upper bound for a single lookup.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.resolver = build_resolver(self.timeout, self.nameserver);
        self
    }

    /// Queries only the given nameserver (port 53, UDP).
    pub fn with_nameserver(mut self, nameserver: IpAddr) -> Self {
        self.nameserver = Some(nameserver);
        self.resolver = build_resolver(self.timeout, self.nameserver);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn build_resolver(timeout: Duration, nameserver: Option<IpAddr>) -> TokioAsyncResolver {
    let (config, mut opts) = match nameserver {
        Some(ip) => {
            let mut config = ResolverConfig::new();
            config.add_name_server(NameServerConfig::new(SocketAddr::new(ip, 53), Protocol::Udp));
            (config, ResolverOpts::default())
        }
        None => read_system_conf().unwrap_or_else(|e| {
            debug!(error = %e, "System resolver config unavailable, using Google DNS");
            (ResolverConfig::google(), ResolverOpts::default())
        }),
    };

    opts.timeout = timeout;
    opts.attempts = 1;

    TokioAsyncResolver::tokio(config, opts)
}

#[async_trait]
impl HostResolver for DnsResolver {
    #[instrument(skip(self), fields(hostname = %hostname))]
    async fn resolve(&self, hostname: &str) -> Option<IpAddr> {
        // The resolver's own timeout is per query attempt; this bounds the whole lookup.
        let lookup = tokio::time::timeout(self.timeout, self.resolver.ipv4_lookup(hostname)).await;

        match lookup {
            Ok(Ok(response)) => {
                let address = response.iter().next().map(|a| IpAddr::V4(a.0));
                debug!(address = ?address, "Resolved");
                address
            }
            Ok(Err(e)) => {
                debug!(error = %e, "A lookup failed");
                None
            }
            Err(_) => {
                debug!(timeout_ms = self.timeout.as_millis() as u64, "A lookup timed out");
                None
            }
        }
    }
}

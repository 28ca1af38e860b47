mod resolver;

pub use resolver::{DnsResolver, HostResolver};

mod executor;

pub use executor::{LineCallback, Scanner, DEFAULT_CONCURRENCY};

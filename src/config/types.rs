use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Default number of workers in a pool (per host when routing by host)
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Main configuration structure for Pageweight
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetcher: FetcherConfig,
    pub output: OutputConfig,
}

/// How fetches are scheduled across and within pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConcurrencyMode {
    /// One page after the other, every fetch inline
    #[default]
    #[serde(rename = "none", alias = "sequential")]
    Sequential,

    /// One task per page, fetches inline within the page
    PerPage,

    /// One task per page, every fetch through a shared worker pool
    PerRequest,

    /// One task per page, every fetch through a pool dedicated to its host
    PerRequestPerHost,
}

impl ConcurrencyMode {
    /// Resolves the mode from the `-c`, `-r` and `-H` command line switches.
    ///
    /// Resource and host level concurrency only apply in concurrent mode, and
    /// host level concurrency only applies on top of resource level concurrency.
    pub fn from_flags(concurrent: bool, per_request: bool, per_host: bool) -> Self {
        match (concurrent, per_request, per_host) {
            (false, _, _) => Self::Sequential,
            (true, false, _) => Self::PerPage,
            (true, true, false) => Self::PerRequest,
            (true, true, true) => Self::PerRequestPerHost,
        }
    }

    /// Returns true if pages are resolved concurrently with each other
    pub fn is_concurrent(&self) -> bool {
        !matches!(self, Self::Sequential)
    }

    /// Returns true if fetches go through a worker pool
    pub fn uses_pool(&self) -> bool {
        matches!(self, Self::PerRequest | Self::PerRequestPerHost)
    }
}

impl fmt::Display for ConcurrencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sequential => "none",
            Self::PerPage => "per-page",
            Self::PerRequest => "per-request",
            Self::PerRequestPerHost => "per-request-per-host",
        };
        f.write_str(name)
    }
}

/// Fetching behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Number of workers per pool
    #[serde(rename = "pool-size")]
    pub pool_size: usize,

    /// Concurrency mode
    pub mode: ConcurrencyMode,

    /// Deadline for a whole request, body included (milliseconds)
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Deadline for establishing a connection (milliseconds)
    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            mode: ConcurrencyMode::default(),
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            user_agent: format!("pageweight/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetcherConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print only the slowest resource of each page
    #[serde(rename = "slowest-only")]
    pub slowest_only: bool,

    /// Count new network connections per host and print them after the run
    pub trace: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_flags() {
        assert_eq!(
            ConcurrencyMode::from_flags(false, false, false),
            ConcurrencyMode::Sequential
        );
        assert_eq!(
            ConcurrencyMode::from_flags(true, false, false),
            ConcurrencyMode::PerPage
        );
        assert_eq!(
            ConcurrencyMode::from_flags(true, true, false),
            ConcurrencyMode::PerRequest
        );
        assert_eq!(
            ConcurrencyMode::from_flags(true, true, true),
            ConcurrencyMode::PerRequestPerHost
        );
    }

    #[test]
    fn test_switches_ignored_without_concurrency() {
        assert_eq!(
            ConcurrencyMode::from_flags(false, true, true),
            ConcurrencyMode::Sequential
        );
        assert_eq!(
            ConcurrencyMode::from_flags(true, false, true),
            ConcurrencyMode::PerPage
        );
    }

    #[test]
    fn test_mode_predicates() {
        assert!(!ConcurrencyMode::Sequential.is_concurrent());
        assert!(ConcurrencyMode::PerPage.is_concurrent());
        assert!(!ConcurrencyMode::PerPage.uses_pool());
        assert!(ConcurrencyMode::PerRequestPerHost.uses_pool());
        assert_eq!(ConcurrencyMode::PerRequestPerHost.to_string(), "per-request-per-host");
    }
}

//! Pageweight: measures the total byte weight of web pages
//!
//! For each page address the crate fetches the HTML document, discovers the
//! stylesheets, scripts and images it references, fetches those too, and
//! reports the aggregate size and timing. Fetching can run sequentially, one
//! task per page, through a shared worker pool, or through a router that gives
//! every host its own pool.

pub mod config;
pub mod discovery;
pub mod engine;
pub mod fetch;
pub mod output;
pub mod page;
pub mod pool;
pub mod resolver;
pub mod resource;
pub mod trace;

use std::time::Duration;
use thiserror::Error;

/// Main error type for Pageweight operations
#[derive(Debug, Error)]
pub enum PageWeightError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// A page address that cannot be turned into a page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Failed to parse address '{address}': {message}")]
    Parse { address: String, message: String },

    #[error("Unsupported scheme '{scheme}' in address '{address}'")]
    UnsupportedScheme { address: String, scheme: String },

    #[error("Missing host in address '{0}'")]
    MissingHost(String),
}

/// Failure of a single fetch. Terminal for the resource, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    #[error("Fetch of {url} was cancelled")]
    Cancelled { url: String },
}

/// Failure while discovering the resources referenced by a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("Cannot resolve references against '{0}'")]
    InvalidBase(String),

    #[error("Invalid selector: {0}")]
    Selector(String),
}

/// Failure to hand a request to a pool or to get its result back
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Request channel closed while submitting {0}")]
    Closed(String),

    #[error("Shut down before {0} was answered")]
    Shutdown(String),
}

/// Reason a page stopped before its assets were resolved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Result type alias for Pageweight operations
pub type Result<T> = std::result::Result<T, PageWeightError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, ConcurrencyMode};
pub use discovery::{Discoverer, HtmlDiscoverer};
pub use engine::{Coordinator, RunReport};
pub use fetch::{Fetcher, HttpFetcher};
pub use page::{Page, ResolveState};
pub use resource::{Resource, ResourceType};

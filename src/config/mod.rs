//! Configuration module for Pageweight
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so the file is optional and may be partial.
//!
//! # Example
//!
//! ```no_run
//! use pageweight::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("pageweight.toml")).unwrap();
//! println!("Pool size: {}", config.fetcher.pool_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ConcurrencyMode, Config, FetcherConfig, OutputConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;

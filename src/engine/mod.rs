//! Run orchestration
//!
//! This module turns a list of page addresses into resolved pages:
//! - Building pages, skipping addresses that do not parse
//! - Starting one resolution per page in the configured concurrency mode
//! - Sharing one worker pool or host router across all pages
//! - Collecting pages as they complete and shutting everything down

mod coordinator;

pub use coordinator::{Coordinator, RunReport};

use crate::config::Config;
use std::path::Path;

/// Weighs every page in `addresses` with the given configuration
///
/// This is the main entry point for embedding. It will:
/// 1. Build the HTTP fetcher (and the connection tracer if enabled)
/// 2. Resolve every page in the configured mode
/// 3. Shut down pools, router and tracer
///
/// # Example
///
/// ```no_run
/// use pageweight::config::Config;
/// use pageweight::engine::weigh;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = weigh(&Config::default(), &["https://example.com/".to_string()]).await?;
/// for page in &report.pages {
///     println!("{}: {} bytes", page.address(), page.total_bytes());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn weigh(config: &Config, addresses: &[String]) -> crate::Result<RunReport> {
    let coordinator = Coordinator::new(config)?;
    Ok(coordinator.run(addresses).await)
}

/// Reads page addresses from a file, one per line
///
/// Blank lines and lines starting with `#` are skipped.
pub fn read_addresses(path: &Path) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_addresses(&content))
}

fn parse_addresses(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_addresses() {
        let content = "https://a.com/\n\n  https://b.com/  \n# comment\nhttps://c.com/";
        assert_eq!(
            parse_addresses(content),
            vec!["https://a.com/", "https://b.com/", "https://c.com/"]
        );
    }

    #[test]
    fn test_read_addresses() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"https://a.com/\nhttps://b.com/\n").unwrap();
        file.flush().unwrap();

        let addresses = read_addresses(file.path()).unwrap();
        assert_eq!(addresses.len(), 2);
    }

    #[test]
    fn test_read_addresses_missing_file() {
        assert!(read_addresses(Path::new("/nonexistent/urls.txt")).is_err());
    }
}

//! In-memory fetcher
//!
//! Answers from a fixed table of bodies and failures, optionally after a
//! delay, and keeps track of how many fetches were in flight at once (overall
//! and per host).

use crate::fetch::Fetcher;
use crate::resource::host_key;
use crate::FetchError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
enum MockResponse {
    Body(Vec<u8>),
    Failure(String),
}

#[derive(Debug, Default)]
struct Activity {
    in_flight: usize,
    peak: usize,
    in_flight_by_host: HashMap<String, usize>,
    peak_by_host: HashMap<String, usize>,
    calls: HashMap<String, usize>,
}

/// Fetcher that serves canned responses
///
/// URLs without a canned response fail like a refused connection.
#[derive(Debug, Default)]
pub struct MockFetcher {
    responses: HashMap<String, MockResponse>,
    latency: Duration,
    activity: Mutex<Activity>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` for `url`
    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.responses
            .insert(url.into(), MockResponse::Body(body.into()));
        self
    }

    /// Fails every fetch of `url` with a transport error
    pub fn with_failure(mut self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.responses
            .insert(url.into(), MockResponse::Failure(message.into()));
        self
    }

    /// Delays every response
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Most fetches ever in flight at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.activity().peak
    }

    /// Most fetches ever in flight at the same time against `host`
    pub fn peak_in_flight_for(&self, host: &str) -> usize {
        self.activity().peak_by_host.get(host).copied().unwrap_or(0)
    }

    /// Number of times `url` was fetched
    pub fn calls(&self, url: &str) -> usize {
        self.activity().calls.get(url).copied().unwrap_or(0)
    }

    /// Number of fetches of any URL
    pub fn total_calls(&self) -> usize {
        self.activity().calls.values().sum()
    }

    fn activity(&self) -> MutexGuard<'_, Activity> {
        self.activity.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(&self, url: &str, host: &str) {
        let mut guard = self.activity();
        let activity = &mut *guard;
        *activity.calls.entry(url.to_string()).or_default() += 1;

        activity.in_flight += 1;
        activity.peak = activity.peak.max(activity.in_flight);

        let current = {
            let count = activity
                .in_flight_by_host
                .entry(host.to_string())
                .or_default();
            *count += 1;
            *count
        };
        let peak = activity.peak_by_host.entry(host.to_string()).or_default();
        *peak = (*peak).max(current);
    }

    fn leave(&self, host: &str) {
        let mut guard = self.activity();
        let activity = &mut *guard;
        activity.in_flight = activity.in_flight.saturating_sub(1);
        if let Some(count) = activity.in_flight_by_host.get_mut(host) {
            *count = count.saturating_sub(1);
        }
    }
}

/// Marks a fetch as finished when dropped, including when it is cancelled
struct InFlight<'a> {
    fetcher: &'a MockFetcher,
    host: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.fetcher.leave(&self.host);
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let host = host_key(url);
        self.enter(url, &host);
        let _in_flight = InFlight {
            fetcher: self,
            host,
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.responses.get(url) {
            Some(MockResponse::Body(body)) => Ok(body.clone()),
            Some(MockResponse::Failure(message)) => Err(FetchError::Transport {
                url: url.to_string(),
                message: message.clone(),
            }),
            None => Err(FetchError::Transport {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_canned_body() {
        let fetcher = MockFetcher::new().with_body("https://a.com/", "hello");
        assert_eq!(fetcher.fetch("https://a.com/").await.unwrap(), b"hello");
        assert_eq!(fetcher.calls("https://a.com/"), 1);
    }

    #[tokio::test]
    async fn test_unknown_url_fails() {
        let fetcher = MockFetcher::new();
        let result = fetcher.fetch("https://a.com/missing").await;
        assert!(matches!(result, Err(FetchError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_in_flight_accounting() {
        let fetcher = MockFetcher::new()
            .with_body("https://a.com/1", "1")
            .with_body("https://a.com/2", "2")
            .with_latency(Duration::from_millis(20));

        let (first, second) = tokio::join!(
            fetcher.fetch("https://a.com/1"),
            fetcher.fetch("https://a.com/2")
        );

        assert!(first.is_ok() && second.is_ok());
        assert_eq!(fetcher.peak_in_flight(), 2);
        assert_eq!(fetcher.peak_in_flight_for("a.com"), 2);
        assert_eq!(fetcher.total_calls(), 2);
    }
}

//! HTTP fetcher implementation
//!
//! This module handles all network requests, including:
//! - Building the HTTP client with the configured user agent and deadlines
//! - Reading whole response bodies
//! - Classifying transport failures
//! - Reporting new connections to the connection tracer

use crate::config::FetcherConfig;
use crate::fetch::Fetcher;
use crate::trace::{ConnEvent, TraceSink};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration
/// * `trace` - Where to report new connections, if tracing is enabled
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use pageweight::config::FetcherConfig;
/// use pageweight::fetch::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default(), None).unwrap();
/// ```
pub fn build_http_client(
    config: &FetcherConfig,
    trace: Option<TraceSink>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .gzip(true)
        .brotli(true);

    if let Some(sink) = trace {
        builder = builder.dns_resolver(Arc::new(TracingResolver { sink }));
    }

    builder.build()
}

/// Fetcher backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher from configuration, optionally reporting connections
    pub fn new(config: &FetcherConfig, trace: Option<TraceSink>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, trace)?,
            timeout: config.request_timeout(),
        })
    }

    fn classify(&self, url: &str, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                after: self.timeout,
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    /// Fetches the full body of `url`
    ///
    /// Error statuses are not transport failures: their body is weighed like
    /// any other.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("{} answered HTTP {}", url, status.as_u16());
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                self.classify(url, e)
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        tracing::trace!("Fetched {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

/// DNS resolver that reports every lookup to the connection tracer
///
/// The client resolves a host each time it opens a new connection, so the
/// lookups double as connection events. IP literal hosts skip resolution and
/// are not reported.
struct TracingResolver {
    sink: TraceSink,
}

impl Resolve for TracingResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(resolve_and_record(
            self.sink.clone(),
            name.as_str().to_string(),
        ))
    }
}

async fn resolve_and_record(sink: TraceSink, host: String) -> Result<Addrs, BoxError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0))
        .await?
        .collect();

    if let Some(addr) = addrs.first() {
        sink.record(ConnEvent {
            host: host.clone(),
            addr: addr.ip().to_string(),
        });
    }

    Ok(Box::new(addrs.into_iter()))
}

//! Resources: the fetchable units of a page
//!
//! A page is made of one document resource plus the stylesheets, scripts and
//! images it references. Each resource records the outcome of its single fetch.

use crate::fetch::Fetcher;
use crate::FetchError;
use std::fmt;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Kind of a resource, as discovered from the tag that referenced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceType {
    /// A tag that does not point at anything worth fetching
    NotRemote,

    /// The HTML document of a page
    Document,

    /// `<link rel="stylesheet">`
    Stylesheet,

    /// `<script src>`
    Script,

    /// `<img src>` and icon links
    Image,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotRemote => "not a remote resource",
            Self::Document => "html",
            Self::Stylesheet => "css",
            Self::Script => "script",
            Self::Image => "img",
        };
        f.write_str(name)
    }
}

/// A single fetchable unit and the outcome of fetching it
///
/// `size` stays 0 until a fetch succeeds. A resource is fetched at most once
/// per page resolution, by whichever task currently owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Absolute URL of the resource
    pub url: String,

    /// What kind of resource this is
    pub kind: ResourceType,

    /// Body length in bytes
    pub size: usize,

    /// Why the fetch failed, if it did
    pub error: Option<FetchError>,

    /// Wall-clock time spent fetching
    pub time_taken: Duration,
}

impl Resource {
    /// Creates an unfetched resource
    pub fn new(url: impl Into<String>, kind: ResourceType) -> Self {
        Self {
            url: url.into(),
            kind,
            size: 0,
            error: None,
            time_taken: Duration::ZERO,
        }
    }

    /// Returns the `host[:port]` this resource is served from
    ///
    /// Unparseable URLs map to the empty host.
    pub fn host(&self) -> String {
        host_key(&self.url)
    }

    /// Returns true if the resource was fetched without error
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Fetches the resource, recording size, error and elapsed time
    ///
    /// The fetch is abandoned with [`FetchError::Cancelled`] as soon as
    /// `cancel` fires. A failure is final: the resource keeps a size of 0.
    pub async fn fetch(
        &mut self,
        fetcher: &dyn Fetcher,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled {
                url: self.url.clone(),
            }),
            body = fetcher.fetch(&self.url) => body,
        };
        self.time_taken = started.elapsed();

        match &outcome {
            Ok(body) => {
                self.size = body.len();
                self.error = None;
            }
            Err(e) => {
                tracing::debug!("Fetch of {} failed: {}", self.url, e);
                self.size = 0;
                self.error = Some(e.clone());
            }
        }
        outcome
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(e) => write!(f, "({}|{}|{}|{})", self.kind, self.url, self.size, e),
            None => write!(f, "({}|{}|{}|ok)", self.kind, self.url, self.size),
        }
    }
}

/// Extracts `host[:port]` from a URL string, or an empty string if it has none
pub fn host_key(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

//! The fetch primitive
//!
//! Everything that touches the network goes through the [`Fetcher`] trait: the
//! sequential resolver calls it inline, pool workers call it on behalf of
//! page resolvers. [`HttpFetcher`] is the real implementation; [`MockFetcher`]
//! answers from memory.

mod http;
mod mock;

pub use http::{build_http_client, HttpFetcher};
pub use mock::MockFetcher;

use crate::FetchError;
use async_trait::async_trait;

/// Fetches the bytes behind a URL
///
/// No retries: a failed fetch is terminal for the resource that asked for it.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

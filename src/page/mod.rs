//! Pages and their resolution state
//!
//! A [`Page`] is a document resource plus the deduplicated set of assets it
//! references and the aggregate of their sizes. Only the task resolving a
//! page mutates it; pool workers hand their results back over a channel.

mod state;

pub use state::ResolveState;

use crate::discovery::Discoverer;
use crate::resource::{Resource, ResourceType};
use crate::{AddressError, DiscoveryError, PageError};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use url::Url;

/// Assets keyed by type, then by URL; a URL appears once per type
pub type AssetMap = BTreeMap<ResourceType, BTreeMap<String, Resource>>;

/// A web page being weighed
#[derive(Debug, Clone)]
pub struct Page {
    address: Url,
    document: Resource,
    assets: AssetMap,
    total_bytes: usize,
    resolve_duration: Duration,
    parse_duration: Duration,
    error: Option<PageError>,
    state: ResolveState,
}

impl Page {
    /// Creates a page for an address
    ///
    /// # Errors
    ///
    /// Fails if the address does not parse as an absolute HTTP(S) URL with a
    /// host.
    pub fn new(raw: &str) -> Result<Self, AddressError> {
        let raw = raw.trim();
        let address = Url::parse(raw).map_err(|e| AddressError::Parse {
            address: raw.to_string(),
            message: e.to_string(),
        })?;

        if address.scheme() != "http" && address.scheme() != "https" {
            return Err(AddressError::UnsupportedScheme {
                address: raw.to_string(),
                scheme: address.scheme().to_string(),
            });
        }
        if address.host_str().is_none() {
            return Err(AddressError::MissingHost(raw.to_string()));
        }

        Ok(Self {
            address,
            document: Resource::new(raw, ResourceType::Document),
            assets: AssetMap::new(),
            total_bytes: 0,
            resolve_duration: Duration::ZERO,
            parse_duration: Duration::ZERO,
            error: None,
            state: ResolveState::Created,
        })
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    pub fn document(&self) -> &Resource {
        &self.document
    }

    pub fn assets(&self) -> &AssetMap {
        &self.assets
    }

    /// Iterates every asset regardless of type
    pub fn asset_resources(&self) -> impl Iterator<Item = &Resource> {
        self.assets.values().flat_map(|by_url| by_url.values())
    }

    /// Number of distinct assets
    pub fn num_assets(&self) -> usize {
        self.assets.values().map(BTreeMap::len).sum()
    }

    /// Document size plus the size of every successfully fetched asset
    ///
    /// Only final once the page is [`ResolveState::Done`].
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Wall-clock span from the document request to the last asset result
    pub fn resolve_duration(&self) -> Duration {
        self.resolve_duration
    }

    /// Time spent discovering assets in the document
    pub fn parse_duration(&self) -> Duration {
        self.parse_duration
    }

    pub fn error(&self) -> Option<&PageError> {
        self.error.as_ref()
    }

    pub fn state(&self) -> ResolveState {
        self.state
    }

    /// The asset that took longest to fetch
    pub fn slowest_asset(&self) -> Option<&Resource> {
        self.asset_resources().max_by_key(|r| r.time_taken)
    }

    fn advance(&mut self, next: ResolveState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "Invalid state transition: {:?} -> {:?}",
            self.state,
            next
        );
        tracing::trace!("{}: {} -> {}", self.document.url, self.state, next);
        self.state = next;
    }

    /// Starts resolution, returning the document resource to fetch
    pub(crate) fn begin(&mut self) -> Resource {
        self.advance(ResolveState::FetchingDocument);
        self.document.clone()
    }

    /// Stores the fetched document; its size counts as soon as it succeeded
    pub(crate) fn record_document(&mut self, document: Resource) {
        if document.succeeded() {
            self.total_bytes += document.size;
        }
        self.document = document;
    }

    /// Discovers assets in the document body and records them, deduplicated
    pub(crate) fn discover(
        &mut self,
        body: &[u8],
        discoverer: &dyn Discoverer,
    ) -> Result<(), DiscoveryError> {
        self.advance(ResolveState::Discovering);
        let started = Instant::now();
        let discovered = discoverer.discover(&self.address, body);
        self.parse_duration = started.elapsed();

        for resource in discovered? {
            self.assets
                .entry(resource.kind)
                .or_default()
                .entry(resource.url.clone())
                .or_insert(resource);
        }

        tracing::debug!(
            "Discovered {} assets in {} in {:?}",
            self.num_assets(),
            self.document.url,
            self.parse_duration
        );
        Ok(())
    }

    /// Moves to asset fetching, returning a copy of every asset to fetch
    pub(crate) fn pending_assets(&mut self) -> Vec<Resource> {
        self.advance(ResolveState::FetchingAssets);
        self.asset_resources().cloned().collect()
    }

    /// Stores a fetched asset; failed assets are kept but weigh nothing
    pub(crate) fn record_asset(&mut self, asset: Resource) {
        if asset.succeeded() {
            self.total_bytes += asset.size;
        }
        self.assets
            .entry(asset.kind)
            .or_default()
            .insert(asset.url.clone(), asset);
    }

    /// Ends resolution
    pub(crate) fn finish(&mut self, started: Instant, error: Option<PageError>) {
        self.resolve_duration = started.elapsed();
        self.error = error;
        self.advance(ResolveState::Done);
    }
}

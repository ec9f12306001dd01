//! Coordinator - fans pages out and collects them back
//!
//! One resolution runs per page. In the pooled modes every page shares one
//! [`WorkerPool`] or one [`HostRouter`]; completed pages come back over a
//! shared channel in completion order.

use crate::config::{ConcurrencyMode, Config};
use crate::discovery::{Discoverer, HtmlDiscoverer};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::page::Page;
use crate::pool::{HostRouter, PoolHandle, WorkerPool};
use crate::resolver::{resolve_pooled, resolve_sequentially};
use crate::trace::{ConnTrace, ConnTracer};
use crate::{AddressError, PageWeightError};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Everything a run produced
#[derive(Debug)]
pub struct RunReport {
    /// One page per address that parsed, in completion order
    pub pages: Vec<Page>,

    /// Addresses that were skipped because they did not parse
    pub skipped: Vec<AddressError>,

    /// Hosts that got a dedicated pool (per-host mode only)
    pub hosts: Vec<String>,

    /// Connection counts, if tracing was enabled
    pub trace: Option<ConnTrace>,

    /// Wall-clock time of the whole run
    pub elapsed: Duration,
}

/// Main run coordinator structure
pub struct Coordinator {
    mode: ConcurrencyMode,
    pool_size: usize,
    fetcher: Arc<dyn Fetcher>,
    discoverer: Arc<dyn Discoverer>,
    tracer: Option<ConnTracer>,
    shutdown: CancellationToken,
}

impl Coordinator {
    /// Creates a coordinator fetching over HTTP
    ///
    /// Starts the connection tracer when `output.trace` is set, so this must
    /// be called inside a Tokio runtime.
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(PageWeightError)` - The HTTP client could not be built
    pub fn new(config: &Config) -> Result<Self, PageWeightError> {
        let tracer = config.output.trace.then(ConnTracer::start);
        let fetcher = HttpFetcher::new(&config.fetcher, tracer.as_ref().map(ConnTracer::sink))?;

        let mut coordinator = Self::with_parts(
            config.fetcher.mode,
            config.fetcher.pool_size,
            Arc::new(fetcher),
            Arc::new(HtmlDiscoverer),
        );
        coordinator.tracer = tracer;
        Ok(coordinator)
    }

    /// Creates a coordinator from explicit collaborators
    pub fn with_parts(
        mode: ConcurrencyMode,
        pool_size: usize,
        fetcher: Arc<dyn Fetcher>,
        discoverer: Arc<dyn Discoverer>,
    ) -> Self {
        Self {
            mode,
            pool_size: pool_size.max(1),
            fetcher,
            discoverer,
            tracer: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    /// Token that aborts the run when cancelled
    ///
    /// Outstanding fetches end with a cancellation error; every started page
    /// is still reported.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Resolves every address and tears down all pools before returning
    pub async fn run(self, addresses: &[String]) -> RunReport {
        let started = Instant::now();

        let mut pages = Vec::with_capacity(addresses.len());
        let mut skipped = Vec::new();
        for address in addresses {
            match Page::new(address) {
                Ok(page) => pages.push(page),
                Err(e) => {
                    tracing::warn!("Error constructing page: {}", e);
                    skipped.push(e);
                }
            }
        }

        if self.mode.uses_pool() {
            tracing::info!(
                "Resolving {} pages in {} mode (pool size {})",
                pages.len(),
                self.mode,
                self.pool_size
            );
        } else {
            tracing::info!("Resolving {} pages in {} mode", pages.len(), self.mode);
        }

        let mut hosts = Vec::new();
        let pages = match self.mode {
            ConcurrencyMode::Sequential => self.resolve_in_order(pages).await,
            ConcurrencyMode::PerPage => self.resolve_per_page(pages).await,
            ConcurrencyMode::PerRequest => {
                let pool = WorkerPool::spawn(
                    self.pool_size,
                    self.fetcher.clone(),
                    self.shutdown.child_token(),
                );
                let pages = self.resolve_through(pool.handle(), pages).await;
                pool.shutdown().await;
                pages
            }
            ConcurrencyMode::PerRequestPerHost => {
                let router = HostRouter::spawn(
                    self.pool_size,
                    self.fetcher.clone(),
                    self.shutdown.child_token(),
                );
                let pages = self.resolve_through(router.handle(), pages).await;
                hosts = router.shutdown().await;
                pages
            }
        };

        let trace = match self.tracer {
            Some(tracer) => Some(tracer.finish().await),
            None => None,
        };

        let elapsed = started.elapsed();
        tracing::info!("Resolved {} pages in {:?}", pages.len(), elapsed);

        RunReport {
            pages,
            skipped,
            hosts,
            trace,
            elapsed,
        }
    }

    async fn resolve_in_order(&self, pages: Vec<Page>) -> Vec<Page> {
        let mut resolved = Vec::with_capacity(pages.len());
        for mut page in pages {
            resolve_sequentially(
                &mut page,
                self.fetcher.as_ref(),
                self.discoverer.as_ref(),
                &self.shutdown,
            )
            .await;
            log_page(&page);
            resolved.push(page);
        }
        resolved
    }

    async fn resolve_per_page(&self, pages: Vec<Page>) -> Vec<Page> {
        let expected = pages.len();
        let completed = fan_out(pages, |mut page| {
            let fetcher = self.fetcher.clone();
            let discoverer = self.discoverer.clone();
            let cancel = self.shutdown.clone();
            async move {
                resolve_sequentially(&mut page, fetcher.as_ref(), discoverer.as_ref(), &cancel)
                    .await;
                page
            }
        });
        collect_pages(completed, expected).await
    }

    async fn resolve_through(&self, pool: PoolHandle, pages: Vec<Page>) -> Vec<Page> {
        let expected = pages.len();
        let completed = fan_out(pages, |mut page| {
            let pool = pool.clone();
            let discoverer = self.discoverer.clone();
            async move {
                resolve_pooled(&mut page, &pool, discoverer.as_ref()).await;
                page
            }
        });
        collect_pages(completed, expected).await
    }
}

/// Spawns one task per page, each sending its page back when done
fn fan_out<F, Fut>(pages: Vec<Page>, resolve: F) -> mpsc::Receiver<Page>
where
    F: Fn(Page) -> Fut,
    Fut: Future<Output = Page> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(pages.len().max(1));
    for page in pages {
        let tx = tx.clone();
        let resolution = resolve(page);
        tokio::spawn(async move {
            let page = resolution.await;
            if tx.send(page).await.is_err() {
                tracing::warn!("Page collector went away");
            }
        });
    }
    rx
}

/// Receives pages until every resolution task has finished
async fn collect_pages(mut completed: mpsc::Receiver<Page>, expected: usize) -> Vec<Page> {
    let mut pages = Vec::with_capacity(expected);
    while let Some(page) = completed.recv().await {
        log_page(&page);
        pages.push(page);
    }
    if pages.len() != expected {
        tracing::warn!("Collected {} of {} pages", pages.len(), expected);
    }
    pages
}

fn log_page(page: &Page) {
    debug_assert!(
        page.state().is_terminal(),
        "{} collected in state {}",
        page.address(),
        page.state()
    );
    match page.error() {
        Some(e) => tracing::warn!("Error resolving page {}: {}", page.address(), e),
        None => tracing::debug!(
            "Resolved {}: {} bytes across {} assets in {:?}",
            page.address(),
            page.total_bytes(),
            page.num_assets(),
            page.resolve_duration()
        ),
    }
}

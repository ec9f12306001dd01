use crate::discovery::Discoverer;
use crate::page::Page;
use crate::pool::{PoolHandle, Request};
use crate::resource::{Resource, ResourceType};
use crate::{DispatchError, FetchError, PageError};
use std::collections::BTreeSet;
use std::time::Instant;
use tokio::sync::mpsc;

/// Resolves a page by submitting every fetch to a pool or router
///
/// All assets are submitted before any result is read. The result channel
/// therefore has one slot per asset, so a worker can always deliver its
/// result without waiting on this resolver, even with a single worker.
pub async fn resolve_pooled(page: &mut Page, pool: &PoolHandle, discoverer: &dyn Discoverer) {
    let started = Instant::now();

    let document = page.begin();
    let document_url = document.url.clone();
    let (tx, mut rx) = mpsc::channel(1);
    if let Err(e) = pool.submit(Request::new(document, tx)).await {
        page.finish(started, Some(e.into()));
        return;
    }

    let Some(outcome) = rx.recv().await else {
        page.finish(started, Some(DispatchError::Shutdown(document_url).into()));
        return;
    };
    page.record_document(outcome.target);

    let body = match outcome.body {
        Ok(body) => body,
        Err(e) => {
            page.finish(started, Some(e.into()));
            return;
        }
    };

    if let Err(e) = page.discover(&body, discoverer) {
        page.finish(started, Some(e.into()));
        return;
    }

    let pending = page.pending_assets();
    if pending.is_empty() {
        page.finish(started, None);
        return;
    }

    let mut unanswered: BTreeSet<(ResourceType, String)> = pending
        .iter()
        .map(|asset| (asset.kind, asset.url.clone()))
        .collect();

    let (tx, mut rx) = mpsc::channel(pending.len());
    let mut submitted = 0;
    let mut failure: Option<PageError> = None;
    for asset in pending {
        match pool.submit(Request::new(asset, tx.clone())).await {
            Ok(()) => submitted += 1,
            Err(e) => {
                failure = Some(e.into());
                break;
            }
        }
    }
    drop(tx);

    for _ in 0..submitted {
        match rx.recv().await {
            Some(outcome) => {
                unanswered.remove(&(outcome.target.kind, outcome.target.url.clone()));
                page.record_asset(outcome.target);
            }
            None => {
                // Every outstanding request was dropped unanswered
                failure.get_or_insert_with(|| {
                    DispatchError::Shutdown(page.document().url.clone()).into()
                });
                break;
            }
        }
    }

    for (kind, url) in unanswered {
        page.record_asset(abandoned(kind, url));
    }

    page.finish(started, failure);
}

/// An asset that was never submitted or whose result never came back
fn abandoned(kind: ResourceType, url: String) -> Resource {
    let error = FetchError::Cancelled { url: url.clone() };
    Resource {
        error: Some(error),
        ..Resource::new(url, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::HtmlDiscoverer;
    use crate::fetch::MockFetcher;
    use crate::page::ResolveState;
    use crate::pool::{HostRouter, WorkerPool};
    use crate::{DiscoveryError, Resource};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use url::Url;

    const PAGE: &str = "https://test.com/";

    struct FailingDiscoverer;

    impl Discoverer for FailingDiscoverer {
        fn discover(&self, _base: &Url, _body: &[u8]) -> Result<Vec<Resource>, DiscoveryError> {
            Err(DiscoveryError::Selector("broken".to_string()))
        }
    }

    fn many_assets(count: usize) -> MockFetcher {
        let mut body = String::new();
        let mut fetcher = MockFetcher::new();
        for i in 0..count {
            body.push_str(&format!(r#"<img src="/{}.png">"#, i));
            fetcher = fetcher.with_body(format!("https://test.com/{}.png", i), vec![0u8; 10]);
        }
        fetcher.with_body(PAGE, body)
    }

    #[tokio::test]
    async fn test_single_worker_does_not_deadlock() {
        let fetcher = Arc::new(many_assets(25));
        let pool = WorkerPool::spawn(1, fetcher.clone(), CancellationToken::new());
        let mut page = Page::new(PAGE).unwrap();

        tokio::time::timeout(
            Duration::from_secs(10),
            resolve_pooled(&mut page, &pool.handle(), &HtmlDiscoverer),
        )
        .await
        .expect("resolution with one worker must complete");

        assert_eq!(page.state(), ResolveState::Done);
        assert_eq!(page.num_assets(), 25);
        assert_eq!(page.total_bytes(), page.document().size + 250);
        assert_eq!(fetcher.peak_in_flight(), 1);

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_resolve_through_router() {
        let fetcher = Arc::new(many_assets(5));
        let router = HostRouter::spawn(2, fetcher, CancellationToken::new());
        let mut page = Page::new(PAGE).unwrap();

        resolve_pooled(&mut page, &router.handle(), &HtmlDiscoverer).await;

        assert!(page.error().is_none());
        assert_eq!(page.num_assets(), 5);

        let hosts = router.shutdown().await;
        assert_eq!(hosts, vec!["test.com".to_string()]);
    }

    #[tokio::test]
    async fn test_discovery_failure_ends_page() {
        let fetcher = Arc::new(many_assets(3));
        let pool = WorkerPool::spawn(2, fetcher.clone(), CancellationToken::new());
        let mut page = Page::new(PAGE).unwrap();

        resolve_pooled(&mut page, &pool.handle(), &FailingDiscoverer).await;

        assert_eq!(page.state(), ResolveState::Done);
        assert!(matches!(page.error(), Some(PageError::Discovery(_))));
        assert_eq!(page.num_assets(), 0);
        assert_eq!(page.total_bytes(), page.document().size);
        assert_eq!(fetcher.total_calls(), 1);

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_mid_batch_marks_unfetched_assets() {
        let fetcher = Arc::new(many_assets(6).with_latency(Duration::from_millis(200)));
        let cancel = CancellationToken::new();
        let pool = WorkerPool::spawn(1, fetcher, cancel.clone());
        let handle = pool.handle();

        let resolution = tokio::spawn(async move {
            let mut page = Page::new(PAGE).unwrap();
            resolve_pooled(&mut page, &handle, &HtmlDiscoverer).await;
            page
        });
        tokio::time::sleep(Duration::from_millis(500)).await;
        cancel.cancel();

        let page = tokio::time::timeout(Duration::from_secs(10), resolution)
            .await
            .expect("cancelled resolution must complete")
            .unwrap();
        pool.shutdown().await;

        assert_eq!(page.state(), ResolveState::Done);
        assert_eq!(page.num_assets(), 6);
        assert!(page.asset_resources().any(|a| a.error.is_some()));
        for asset in page.asset_resources() {
            assert!(
                !(asset.succeeded() && asset.size == 0),
                "{} reported as fetched",
                asset.url
            );
        }
        let fetched: usize = page
            .asset_resources()
            .filter(|a| a.succeeded())
            .map(|a| a.size)
            .sum();
        assert_eq!(page.total_bytes(), page.document().size + fetched);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown() {
        let pool = WorkerPool::spawn(1, Arc::new(many_assets(1)), CancellationToken::new());
        let handle = pool.handle();
        pool.shutdown().await;

        let mut page = Page::new(PAGE).unwrap();
        resolve_pooled(&mut page, &handle, &HtmlDiscoverer).await;

        assert_eq!(page.state(), ResolveState::Done);
        assert!(matches!(page.error(), Some(PageError::Dispatch(_))));
    }
}

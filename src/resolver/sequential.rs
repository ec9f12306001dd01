use crate::discovery::Discoverer;
use crate::fetch::Fetcher;
use crate::page::Page;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Resolves a page with inline fetches and no concurrency within the page
pub async fn resolve_sequentially(
    page: &mut Page,
    fetcher: &dyn Fetcher,
    discoverer: &dyn Discoverer,
    cancel: &CancellationToken,
) {
    let started = Instant::now();

    let mut document = page.begin();
    let fetched = document.fetch(fetcher, cancel).await;
    page.record_document(document);

    let body = match fetched {
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

    for mut asset in page.pending_assets() {
        // Failures are recorded on the asset and do not stop the page
        let _ = asset.fetch(fetcher, cancel).await;
        page.record_asset(asset);
    }

    page.finish(started, None);
}

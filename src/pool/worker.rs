//! Fixed-size worker pool
//!
//! `size` workers pull requests from one shared channel, first available
//! worker first, and push each outcome to the channel named in the request.
//! Backpressure is the channel itself: when every worker is busy, submitting
//! waits.

use crate::fetch::Fetcher;
use crate::pool::protocol::{FetchOutcome, PoolHandle, Request};
use crate::pool::REQUEST_BUFFER;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type SharedRequests = Arc<Mutex<mpsc::Receiver<Request>>>;

/// A fixed number of fetch workers behind one request channel
pub struct WorkerPool {
    handle: PoolHandle,
    workers: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Spawns `size` workers (at least one)
    ///
    /// The workers run until `cancel` fires or [`WorkerPool::shutdown`] is
    /// called. Must be called inside a Tokio runtime.
    pub fn spawn(size: usize, fetcher: Arc<dyn Fetcher>, cancel: CancellationToken) -> Self {
        let size = size.max(1);
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        let requests: SharedRequests = Arc::new(Mutex::new(rx));

        let workers = (0..size)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    requests.clone(),
                    fetcher.clone(),
                    cancel.clone(),
                ))
            })
            .collect();

        tracing::debug!("Spawned worker pool of {} workers", size);

        Self {
            handle: PoolHandle::new(tx, cancel.clone()),
            workers,
            cancel,
        }
    }

    /// Returns a handle for submitting requests
    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Submits a request through the pool's own handle
    pub async fn submit(&self, request: Request) -> Result<(), crate::DispatchError> {
        self.handle.submit(request).await
    }

    /// Stops every worker and waits for them to exit
    ///
    /// Fetches still in progress are cancelled; their requesters see the
    /// cancellation in the outcome or find their result channel closed.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        drop(self.handle);
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::warn!("Worker exited abnormally: {}", e);
            }
        }
    }
}

async fn run_worker(
    id: usize,
    requests: SharedRequests,
    fetcher: Arc<dyn Fetcher>,
    cancel: CancellationToken,
) {
    loop {
        let next = {
            let mut requests = requests.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                request = requests.recv() => request,
            }
        };

        let Some(request) = next else {
            break;
        };
        serve(request, fetcher.as_ref(), &cancel).await;
    }
    tracing::trace!("Worker {} stopped", id);
}

/// Fetches one request and delivers exactly one outcome for it
async fn serve(request: Request, fetcher: &dyn Fetcher, cancel: &CancellationToken) {
    let Request {
        mut target,
        respond_to,
    } = request;

    tracing::debug!("Fetching {}", target.url);
    let body = target.fetch(fetcher, cancel).await;
    let url = target.url.clone();

    // Result channels are sized to the number of outstanding requests, so
    // delivery only waits if the requester broke that contract. Shutdown
    // gives up on such a wait but never on a free slot.
    tokio::select! {
        biased;
        sent = respond_to.send(FetchOutcome { target, body }) => {
            if sent.is_err() {
                tracing::debug!("Requester of {} went away", url);
            }
        }
        _ = cancel.cancelled() => {
            tracing::debug!("Dropping result for {} on shutdown", url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockFetcher;
    use crate::resource::{Resource, ResourceType};
    use crate::{DispatchError, FetchError};
    use std::time::Duration;

    fn image(url: &str) -> Resource {
        Resource::new(url, ResourceType::Image)
    }

    #[tokio::test]
    async fn test_pool_serves_request() {
        let fetcher = Arc::new(MockFetcher::new().with_body("https://a.com/x.png", "abc"));
        let pool = WorkerPool::spawn(2, fetcher, CancellationToken::new());
        assert_eq!(pool.size(), 2);

        let (tx, mut rx) = mpsc::channel(1);
        pool.submit(Request::new(image("https://a.com/x.png"), tx))
            .await
            .unwrap();

        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.body.unwrap(), b"abc");
        assert_eq!(outcome.target.size, 3);

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_failure_is_delivered() {
        let fetcher = Arc::new(MockFetcher::new());
        let pool = WorkerPool::spawn(1, fetcher, CancellationToken::new());

        let (tx, mut rx) = mpsc::channel(1);
        pool.submit(Request::new(image("https://a.com/missing.png"), tx))
            .await
            .unwrap();

        let outcome = rx.recv().await.unwrap();
        assert!(matches!(outcome.body, Err(FetchError::Transport { .. })));
        assert!(outcome.target.error.is_some());

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_pool_bounds_concurrency() {
        let mut mock = MockFetcher::new().with_latency(Duration::from_millis(20));
        for i in 0..12 {
            mock = mock.with_body(format!("https://a.com/{}.png", i), "x");
        }
        let fetcher = Arc::new(mock);
        let pool = WorkerPool::spawn(3, fetcher.clone(), CancellationToken::new());

        let (tx, mut rx) = mpsc::channel(12);
        for i in 0..12 {
            pool.submit(Request::new(
                image(&format!("https://a.com/{}.png", i)),
                tx.clone(),
            ))
            .await
            .unwrap();
        }
        for _ in 0..12 {
            assert!(rx.recv().await.unwrap().body.is_ok());
        }

        assert_eq!(fetcher.total_calls(), 12);
        assert!(fetcher.peak_in_flight() <= 3);
        assert!(fetcher.peak_in_flight() >= 2);

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_with_idle_workers() {
        let pool = WorkerPool::spawn(4, Arc::new(MockFetcher::new()), CancellationToken::new());
        let handle = pool.handle();

        tokio::time::timeout(Duration::from_secs(5), pool.shutdown())
            .await
            .expect("shutdown should not hang");

        assert!(handle.is_shut_down());
        let (tx, _rx) = mpsc::channel(1);
        let result = handle.submit(Request::new(image("https://a.com/x.png"), tx)).await;
        assert!(matches!(result, Err(DispatchError::Shutdown(_))));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_fetch() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_body("https://a.com/slow.png", "x")
                .with_latency(Duration::from_secs(60)),
        );
        let pool = WorkerPool::spawn(1, fetcher, CancellationToken::new());

        let (tx, mut rx) = mpsc::channel(1);
        pool.submit(Request::new(image("https://a.com/slow.png"), tx))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(5), pool.shutdown())
            .await
            .expect("shutdown should not hang");

        let outcome = rx.recv().await.expect("cancelled fetch still delivers");
        assert!(matches!(outcome.body, Err(FetchError::Cancelled { .. })));
        assert!(matches!(
            outcome.target.error,
            Some(FetchError::Cancelled { .. })
        ));
    }
}

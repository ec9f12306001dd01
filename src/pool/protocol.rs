use crate::resource::Resource;
use crate::{DispatchError, FetchError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A resource to fetch and where to deliver the outcome
///
/// The resource moves into the request and comes back in the outcome, so the
/// worker fetching it is its only owner in the meantime.
#[derive(Debug)]
pub struct Request {
    pub target: Resource,
    pub respond_to: mpsc::Sender<FetchOutcome>,
}

impl Request {
    pub fn new(target: Resource, respond_to: mpsc::Sender<FetchOutcome>) -> Self {
        Self { target, respond_to }
    }
}

/// The result of serving exactly one [`Request`]
#[derive(Debug)]
pub struct FetchOutcome {
    /// The requested resource with its size, error and timing filled in
    pub target: Resource,

    /// The fetched body, or the failure also recorded on `target`
    pub body: Result<Vec<u8>, FetchError>,
}

/// Submission side of a worker pool or host router
#[derive(Debug, Clone)]
pub struct PoolHandle {
    requests: mpsc::Sender<Request>,
    cancel: CancellationToken,
}

impl PoolHandle {
    pub(crate) fn new(requests: mpsc::Sender<Request>, cancel: CancellationToken) -> Self {
        Self { requests, cancel }
    }

    /// Hands a request to the pool, waiting while every worker is busy
    ///
    /// # Errors
    ///
    /// * `DispatchError::Shutdown` - the pool was shut down while waiting
    /// * `DispatchError::Closed` - the pool is gone
    pub async fn submit(&self, request: Request) -> Result<(), DispatchError> {
        let url = request.target.url.clone();
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DispatchError::Shutdown(url)),
            sent = self.requests.send(request) => sent.map_err(|_| DispatchError::Closed(url)),
        }
    }

    /// Returns true once the pool has been told to shut down
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

//! Per-host routing
//!
//! The router is a single dispatcher task owning a host -> pool map. It reads
//! requests from one inbound channel and forwards each to the pool of the
//! request's host, spawning that pool the first time the host shows up.
//! Pools live until the router shuts down.
//!
//! Dispatch is sequential: while forwarding waits on a saturated host pool,
//! requests for every other host wait too.

use crate::fetch::Fetcher;
use crate::pool::protocol::{PoolHandle, Request};
use crate::pool::worker::WorkerPool;
use crate::pool::REQUEST_BUFFER;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Dispatcher giving every host its own worker pool
pub struct HostRouter {
    handle: PoolHandle,
    dispatcher: JoinHandle<Vec<String>>,
    cancel: CancellationToken,
}

impl HostRouter {
    /// Spawns the dispatcher; every host pool gets `pool_size` workers
    ///
    /// Must be called inside a Tokio runtime.
    pub fn spawn(pool_size: usize, fetcher: Arc<dyn Fetcher>, cancel: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        let dispatcher = tokio::spawn(dispatch(rx, pool_size, fetcher, cancel.clone()));

        Self {
            handle: PoolHandle::new(tx, cancel.clone()),
            dispatcher,
            cancel,
        }
    }

    /// Returns a handle for submitting requests
    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    /// Stops the dispatcher and every host pool
    ///
    /// Returns the hosts that got a pool, sorted.
    pub async fn shutdown(self) -> Vec<String> {
        self.cancel.cancel();
        drop(self.handle);
        match self.dispatcher.await {
            Ok(hosts) => hosts,
            Err(e) => {
                tracing::warn!("Host router exited abnormally: {}", e);
                Vec::new()
            }
        }
    }
}

async fn dispatch(
    mut inbound: mpsc::Receiver<Request>,
    pool_size: usize,
    fetcher: Arc<dyn Fetcher>,
    cancel: CancellationToken,
) -> Vec<String> {
    let mut pools: HashMap<String, WorkerPool> = HashMap::new();

    loop {
        let request = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            request = inbound.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        let host = request.target.host();
        let pool = pools.entry(host).or_insert_with_key(|host| {
            tracing::debug!("Creating pool of {} workers for host '{}'", pool_size, host);
            WorkerPool::spawn(pool_size, fetcher.clone(), cancel.child_token())
        });

        if let Err(e) = pool.submit(request).await {
            tracing::debug!("Could not forward request: {}", e);
        }
    }

    let mut hosts: Vec<String> = pools.keys().cloned().collect();
    hosts.sort();

    for (_, pool) in pools {
        pool.shutdown().await;
    }
    tracing::debug!("Host router stopped after serving {} hosts", hosts.len());
    hosts
}

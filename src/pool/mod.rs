//! Bounded-concurrency fetching
//!
//! This module contains the request/result protocol and the two ways of
//! serving it:
//! - [`WorkerPool`]: a fixed number of workers sharing one request channel
//! - [`HostRouter`]: a dispatcher that lazily gives every host its own pool
//!
//! Both hand out a [`PoolHandle`]; page resolvers do not care which one
//! answers their requests.

mod protocol;
mod router;
mod worker;

pub use protocol::{FetchOutcome, PoolHandle, Request};
pub use router::HostRouter;
pub use worker::WorkerPool;

/// Capacity of the shared request channels
///
/// Tokio channels need at least one slot, so this is the closest to a
/// rendezvous channel: a sender blocks as soon as one request is waiting for
/// a free worker.
pub const REQUEST_BUFFER: usize = 1;

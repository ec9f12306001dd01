//! Page resolution
//!
//! Both resolvers walk a page through the same states:
//! `Created -> FetchingDocument -> Discovering -> FetchingAssets -> Done`.
//! A failed document fetch or failed discovery jumps straight to `Done` with
//! the page error set; failed assets are recorded and resolution goes on.
//!
//! - [`resolve_sequentially`] fetches everything inline, one after the other.
//! - [`resolve_pooled`] submits every fetch to a [`PoolHandle`] and collects
//!   the outcomes, fanning out all assets of the page at once.
//!
//! For the same responses both produce the same assets and total bytes.
//!
//! [`PoolHandle`]: crate::pool::PoolHandle

mod pooled;
mod sequential;

pub use pooled::resolve_pooled;
pub use sequential::resolve_sequentially;

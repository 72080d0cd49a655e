//! Recomputation callbacks.
//!
//! - [`Recompute`] trait invoked by a backoff instance when its wait timer fires
//! - [`RecomputeFn`] closure-backed implementation
//! - [`RecomputeRef`] shared handle (`Arc<dyn Recompute>`)

#[allow(clippy::module_inception)]
mod recompute;
mod recompute_fn;

pub use recompute::{Recompute, RecomputeRef};
pub use recompute_fn::RecomputeFn;

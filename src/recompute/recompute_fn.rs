//! # Function-backed callback (`RecomputeFn`)
//!
//! [`RecomputeFn`] wraps a closure `F: Fn(&str)`. Shared state, if any, has to be
//! captured explicitly (`Arc<...>`), since the closure may run on the timer driver
//! of any instance it is attached to.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use spf_backoff::{Recompute, RecomputeFn, RecomputeRef};
//!
//! let runs = Arc::new(AtomicU32::new(0));
//! let counter = runs.clone();
//! let cb: RecomputeRef = RecomputeFn::arc(move |_instance: &str| {
//!     counter.fetch_add(1, Ordering::Relaxed);
//! });
//!
//! cb.recompute("area1 L1");
//! assert_eq!(runs.load(Ordering::Relaxed), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::recompute::recompute::Recompute;

/// Function-backed callback implementation.
pub struct RecomputeFn<F> {
    f: F,
}

impl<F> RecomputeFn<F> {
    /// Creates a new function-backed callback.
    ///
    /// Prefer [`RecomputeFn::arc`] when you immediately need a [`RecomputeRef`](crate::RecomputeRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the callback and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F> fmt::Debug for RecomputeFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecomputeFn").finish_non_exhaustive()
    }
}

impl<F> Recompute for RecomputeFn<F>
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn recompute(&self, instance: &str) {
        (self.f)(instance)
    }
}

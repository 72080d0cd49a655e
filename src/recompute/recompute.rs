//! # Recomputation callback abstraction.
//!
//! [`Recompute`] is the only point where a backoff instance hands control back to its
//! owner. It is invoked from the instance's timer driver with the instance name and
//! must return promptly: expensive work belongs on another task or thread. The
//! scheduler never retries it and does not look at its outcome.
//!
//! A ready-made implementation exists for `tokio::sync::mpsc::UnboundedSender<String>`,
//! which forwards the instance name to an event loop.
//!
//! # Example
//! ```
//! use spf_backoff::Recompute;
//!
//! struct Spf;
//!
//! impl Recompute for Spf {
//!     fn recompute(&self, instance: &str) {
//!         // queue an SPF run for `instance`...
//!         let _ = instance;
//!     }
//! }
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;

/// # Action run when a backoff instance decides it is time to recompute.
pub trait Recompute: Send + Sync + 'static {
    /// Runs (or schedules) the recomputation for `instance`.
    fn recompute(&self, instance: &str);
}

/// Shared handle to a recomputation callback.
pub type RecomputeRef = Arc<dyn Recompute>;

impl Recompute for mpsc::UnboundedSender<String> {
    fn recompute(&self, instance: &str) {
        // A closed receiver means the owner is gone; nothing left to notify.
        let _ = self.send(instance.to_string());
    }
}

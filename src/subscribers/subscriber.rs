//! # Event subscriber trait.
//!
//! Provides [`Subscribe`], an extension point for plugging custom event handlers
//! into a [`Scheduler`](crate::Scheduler).
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are caught and reported as `EventKind::SubscriberPanicked`)
//!
//! ## Rules
//! - A slow subscriber only affects its own queue.
//! - Queue overflow drops the event **for this subscriber only** and publishes
//!   `EventKind::SubscriberOverflow`.
//! - Events are processed sequentially (FIFO) per subscriber.
//! - Subscribers never block backoff instances or each other.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use spf_backoff::{Event, EventKind, Subscribe};
//!
//! struct SpfRuns;
//!
//! #[async_trait]
//! impl Subscribe for SpfRuns {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::Fired) {
//!             // count recomputations, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "spf-runs" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for scheduler observability.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from a dedicated worker task, in FIFO order.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in overflow/panic events.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this subscriber.
    ///
    /// The runtime clamps capacity to a minimum of 1. Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}

//! Scheduler events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by backoff instances and by the
//! subscriber fan-out.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Backoff` (`trigger`, `cancel`, `destroy`, timer driver),
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the `Scheduler` listener, which fans out to `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

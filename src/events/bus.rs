//! # Event bus for broadcasting scheduler events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from every backoff instance of a [`Scheduler`](crate::Scheduler).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                    Subscriber (one):
//!   Backoff "area1 L1" ──┐
//!   Backoff "area1 L2" ──┼──────► Bus ───────► listener ────► SubscriberSet
//!   Backoff "area2 L1" ──┤  (broadcast chan)   (in Scheduler)
//!   SubscriberSet     ───┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; instances publish from
//!   `trigger()` and from their timer driver.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active subscribers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for scheduler events.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity.
    ///
    /// The minimum capacity is 1 (clamped).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

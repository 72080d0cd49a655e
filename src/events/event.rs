//! # Events emitted by backoff instances.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Scheduling events**: triggers, learn window closing, recomputation runs, stability
//! - **Lifecycle events**: cancellation and destruction of an instance
//! - **Subscriber events**: overflow and panics in the fan-out layer
//!
//! The [`Event`] struct carries additional metadata such as timestamps, instance name,
//! state after the transition and the pending delay.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use spf_backoff::{Event, EventKind, State};
//!
//! let ev = Event::new(EventKind::Triggered)
//!     .with_instance("area1 L1")
//!     .with_state(State::ShortWait)
//!     .with_delay(Duration::from_millis(50));
//!
//! assert_eq!(ev.kind, EventKind::Triggered);
//! assert_eq!(ev.instance.as_deref(), Some("area1 L1"));
//! assert_eq!(ev.delay_ms, Some(50));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::fsm::State;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Scheduling events ===
    /// A trigger was accepted.
    ///
    /// Sets:
    /// - `instance`: instance name
    /// - `state`: state after the trigger
    /// - `delay_ms`: time left until the pending recomputation
    Triggered,

    /// The learn window closed; pending waits are no longer extended.
    ///
    /// Sets:
    /// - `instance`: instance name
    /// - `state`: current state
    LearnExpired,

    /// The recomputation callback was invoked.
    ///
    /// Sets:
    /// - `instance`: instance name
    /// - `state`: state once the callback returned (`LONG_WAIT`, or `QUIET` if the
    ///   callback cancelled its own instance)
    /// - `reason`: `"short_wait"` or `"long_wait"`, the timer class that fired
    Fired,

    /// Hold-down expired with no trigger; the instance is back to `QUIET`.
    ///
    /// Sets:
    /// - `instance`: instance name
    /// - `state`: `QUIET`
    Stable,

    /// A timer expiry was dropped because the instance was cancelled meanwhile.
    ///
    /// Sets:
    /// - `instance`: instance name
    StaleExpiry,

    // === Lifecycle events ===
    /// Pending timers were cancelled and the instance reset to `QUIET`.
    ///
    /// Sets:
    /// - `instance`: instance name
    /// - `state`: `QUIET`
    /// - `reason`: state before cancellation
    Cancelled,

    /// The instance was destroyed; no further events will follow for it.
    ///
    /// Sets:
    /// - `instance`: instance name
    Destroyed,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the backoff instance, if applicable.
    pub instance: Option<Arc<str>>,
    /// Name of the subscriber, for subscriber events.
    pub subscriber: Option<&'static str>,
    /// State of the instance after the transition.
    pub state: Option<State>,
    /// Pending delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable detail.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            instance: None,
            subscriber: None,
            state: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches an instance name.
    #[inline]
    pub fn with_instance(mut self, name: impl Into<Arc<str>>) -> Self {
        self.instance = Some(name.into());
        self
    }

    /// Attaches a subscriber name.
    #[inline]
    pub fn with_subscriber(mut self, name: &'static str) -> Self {
        self.subscriber = Some(name);
        self
    }

    /// Attaches the state after the transition.
    #[inline]
    pub fn with_state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_subscriber(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_subscriber(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

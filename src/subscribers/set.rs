//! # Non-blocking event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`], which distributes events to multiple subscribers
//! concurrently without blocking the publisher.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     │    (bounded)
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//!          (bounded)
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process event N while B processes N+5
//! - **Overflow**: event dropped for that subscriber only, `SubscriberOverflow` published
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Per-subscriber FIFO**: each subscriber sees events in order
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a subscriber uses `Arc<Mutex<T>>` and panics while holding the lock.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for multiple event subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let bus_for_worker = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());

                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let info = panic_message(&*panic_err);
                        bus_for_worker.publish(Event::subscriber_panicked(sub.name(), info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Number of subscribers in the set.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Emits an event to all subscribers.
    ///
    /// - Uses `try_send` (non-blocking)
    /// - On queue full/closed: drops event, publishes `SubscriberOverflow`
    /// - `SubscriberOverflow` events are never re-reported when they overflow themselves
    pub fn emit(&self, event: Arc<Event>) {
        let is_overflow_evt = event.is_subscriber_overflow();

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus.publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Gracefully shuts down all subscriber workers.
    ///
    /// Drops the senders, then waits for every worker to drain its queue.
    pub async fn shutdown(self) {
        drop(self.channels);

        for h in self.workers {
            let _ = h.await;
        }
    }
}

fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _event: &Event) {
            panic!("boom");
        }

        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    #[tokio::test]
    async fn test_fan_out_and_panic_isolation() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let set = SubscriberSet::new(vec![recorder.clone(), Arc::new(Panicker)], bus.clone());
        assert_eq!(set.len(), 2);

        set.emit(Arc::new(Event::new(EventKind::Triggered)));
        set.emit(Arc::new(Event::new(EventKind::Fired)));
        set.shutdown().await;

        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![EventKind::Triggered, EventKind::Fired]
        );

        let first = rx.recv().await.expect("panic event");
        assert_eq!(first.kind, EventKind::SubscriberPanicked);
        assert_eq!(first.subscriber, Some("panicker"));
        assert_eq!(first.instance, None);
        assert_eq!(first.reason.as_deref(), Some("boom"));
    }
}

//! # Scheduler: event bus, subscriber fan-out and a shared lifetime for instances.
//!
//! The [`Scheduler`] owns the event [`Bus`], a [`SubscriberSet`] and a root
//! [`CancellationToken`]. Instances created with [`Scheduler::backoff`] publish on the
//! bus and run their timer driver under a child of that token.
//!
//! ## Architecture
//! ```text
//! Scheduler::backoff(name, policy, cb)
//!     └──► Backoff (bus clone, child token = root.child_token())
//!
//! Event flow:
//!   Backoff ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit(Arc<Event>)
//!                                                   ┌─────────┬─────────┐
//!                                                   ▼         ▼         ▼
//!                                             [queue S1] [queue S2] ... [queue SN]
//!
//! Shutdown path:
//!   shutdown()
//!     └─► root token cancel()   → every instance retires (no more runs, triggers ignored)
//!     └─► listener drains the bus, then SubscriberSet::shutdown() waits for workers
//! ```
//!
//! The scheduler does not own the instances: callers keep each [`Backoff`] and
//! destroy it when the corresponding configuration goes away.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use spf_backoff::{DelayPolicy, RecomputeFn, Scheduler, SchedulerConfig, StateTracker, Subscribe};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tracker = Arc::new(StateTracker::new());
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![tracker.clone()];
//!     let scheduler = Scheduler::builder(SchedulerConfig::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let spf = scheduler.backoff(
//!         "area1 L1",
//!         DelayPolicy::default(),
//!         RecomputeFn::arc(|instance: &str| println!("SPF run for {instance}")),
//!     )?;
//!     spf.trigger();
//!
//!     spf.destroy();
//!     scheduler.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::instance::Backoff;
use crate::core::{SchedulerBuilder, SchedulerConfig};
use crate::error::BackoffError;
use crate::events::Bus;
use crate::policies::DelayPolicy;
use crate::recompute::RecomputeRef;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Shared event bus and lifetime for a group of backoff instances.
pub struct Scheduler {
    cfg: SchedulerConfig,
    bus: Bus,
    token: CancellationToken,
    listener: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Starts building a scheduler.
    pub fn builder(cfg: SchedulerConfig) -> SchedulerBuilder {
        SchedulerBuilder::new(cfg)
    }

    /// Creates a scheduler and spawns its subscriber workers and bus listener.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(cfg: SchedulerConfig, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let set = SubscriberSet::new(subscribers, bus.clone());
        let token = CancellationToken::new();
        let listener = Some(Self::subscriber_listener(&bus, set, token.clone()));

        Self {
            cfg,
            bus,
            token,
            listener,
        }
    }

    /// Forwards bus events to the subscriber set until the scheduler shuts down.
    fn subscriber_listener(
        bus: &Bus,
        set: SubscriberSet,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(Arc::new(ev)),
                        Err(RecvError::Lagged(n)) => {
                            warn!(skipped = n, "event listener lagged behind the bus");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }

            loop {
                match rx.try_recv() {
                    Ok(ev) => set.emit(Arc::new(ev)),
                    Err(TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
            set.shutdown().await;
        })
    }

    /// Creates an instance that publishes on this scheduler's bus.
    ///
    /// Fails with [`BackoffError::InvalidConfig`] if a duration exceeds
    /// [`MAX_DELAY`](crate::MAX_DELAY).
    pub fn backoff(
        &self,
        name: impl Into<Arc<str>>,
        policy: DelayPolicy,
        callback: RecomputeRef,
    ) -> Result<Backoff, BackoffError> {
        Backoff::builder(name, policy, callback)
            .with_bus(self.bus.clone())
            .with_parent_token(self.token.clone())
            .build()
    }

    /// Creates an instance with the configured default policy.
    pub fn backoff_with_defaults(
        &self,
        name: impl Into<Arc<str>>,
        callback: RecomputeRef,
    ) -> Result<Backoff, BackoffError> {
        self.backoff(name, self.cfg.policy, callback)
    }

    /// Event bus shared by every instance of this scheduler.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.cfg
    }

    /// Stops every instance driver, delivers pending events and waits for subscribers.
    ///
    /// Instances stay valid handles afterwards, but they are retired: pending timers
    /// are dropped and later triggers are ignored.
    pub async fn shutdown(mut self) {
        debug!("scheduler shutting down");
        self.token.cancel();
        if let Some(listener) = self.listener.take() {
            let _ = listener.await;
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

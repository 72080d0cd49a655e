//! # spf-backoff
//!
//! **spf-backoff** implements the IETF SPF delay algorithm (RFC 8405): an adaptive
//! scheduler that turns bursts of "something changed" triggers into a bounded
//! number of recomputation runs.
//!
//! The first trigger after a quiet period is served fast (`init_delay`). While
//! triggers keep arriving the scheduler moves to a slower cadence (`long_delay`),
//! and returns to the fast path after a quiet `hold_down` period. A learn timer
//! (`time_to_learn`) bounds how long a burst may keep postponing a run.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   topology change   topology change   topology change
//!         │                 │                 │
//!         ▼                 ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Backoff "area1 L1"   (trigger / cancel / status)                 │
//! │  - Machine: QUIET → SHORT_WAIT → LONG_WAIT, three deadlines       │
//! │  - driver task: sleep_until(next deadline) / Notify / token       │
//! │  - fire gate: generation check, then Recompute::recompute(name)   │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        │ Publishes Events: Triggered, Fired, LearnExpired, Stable,
//!        │                   Cancelled, StaleExpiry, Destroyed
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │              (capacity: SchedulerConfig::bus_capacity)            │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       │   (in Scheduler)       │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                            (per-sub queues)
//!                        ┌──────────┼──────────┐
//!                        ▼          ▼          ▼
//!                  StateTracker  LogWriter   custom
//! ```
//!
//! ### Lifecycle of one burst
//! ```text
//! QUIET ──trigger──► SHORT_WAIT   wait = init_delay, learn = time_to_learn
//!                      │  trigger: wait = max(wait, now + short_delay)
//!                      ▼ wait expires → recompute()
//!                   LONG_WAIT     hold_down armed
//!                      │  trigger: hold_down dropped, wait = max(wait, now + long_delay)
//!                      │  wait expires → recompute(), hold_down armed again
//!                      ▼ hold_down expires
//!                    QUIET
//!
//! learn expiry: pending waits are no longer pushed back.
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                        |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------|
//! | **Instances**     | Owned backoff instance with trigger/cancel/destroy.          | [`Backoff`], [`TriggerHandle`]            |
//! | **Callbacks**     | What runs when the wait timer fires.                         | [`Recompute`], [`RecomputeFn`]            |
//! | **Policies**      | The five delays and their limits.                            | [`DelayPolicy`], [`MAX_DELAY`]            |
//! | **Scheduling**    | Shared bus and lifetime for many instances, per-level sets.  | [`Scheduler`], [`LevelBackoffs`]          |
//! | **Subscriber API**| Hook into instance events.                                   | [`Subscribe`], [`StateTracker`]           |
//! | **Diagnostics**   | Show-style snapshot of an instance.                          | [`Status`]                                |
//! | **Errors**        | Typed configuration errors.                                  | [`BackoffError`]                          |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use spf_backoff::{DelayPolicy, Level, LevelBackoffs, Scheduler, SchedulerConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = Scheduler::builder(SchedulerConfig::default()).build();
//!
//!     // SPF runs are requested over a channel and executed by the protocol task.
//!     let (tx, mut runs) = mpsc::unbounded_channel::<String>();
//!
//!     let mut area = LevelBackoffs::new("area1");
//!     area.configure(&scheduler, DelayPolicy::default(), Arc::new(tx))?;
//!
//!     area.trigger(Level::L1);
//!     area.trigger(Level::L1);
//!
//!     let instance = runs.recv().await.expect("one SPF run");
//!     assert_eq!(instance, "area1 L1");
//!
//!     area.unconfigure();
//!     scheduler.shutdown().await;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod fsm;
mod policies;
mod recompute;
mod subscribers;

// ---- Public re-exports ----

pub use core::{
    Backoff, BackoffBuilder, Level, LevelBackoffs, Scheduler, SchedulerBuilder, SchedulerConfig,
    Status, TriggerHandle,
};
pub use error::BackoffError;
pub use events::{Bus, Event, EventKind};
pub use fsm::{Expiry, Machine, State, Step};
pub use policies::{DelayPolicy, MAX_DELAY};
pub use recompute::{Recompute, RecomputeFn, RecomputeRef};
pub use subscribers::{StateTracker, Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

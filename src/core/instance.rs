//! # Backoff: one SPF delay state machine driven by tokio timers.
//!
//! A [`Backoff`] owns a [`Machine`] behind a mutex and a driver task that sleeps until
//! the machine's next deadline. Triggers update the machine synchronously and wake the
//! driver; expiries are processed by the driver, which is the only place the
//! [`Recompute`](crate::Recompute) callback is invoked.
//!
//! ## Architecture
//! ```text
//! event sources ──► trigger() ──► [Mutex<Machine>] ◄── driver task
//!      (many)           │              ▲                 │
//!                       └─► Notify ────┼─────────────────┤ select! {
//!                                      │                 │   cancelled  → exit
//! cancel()/destroy() ──────────────────┘                 │   notified   → recompute deadline
//!   bump generation, wait for fire gate                  │   sleep_until→ expire_next(now)…
//!                                                        │ }
//!                                                        ▼
//!                                       fire gate: generation check → callback
//! ```
//!
//! ## Rules
//! - `trigger()` never blocks on the callback and never invokes it.
//! - At most one wait deadline exists per instance (held by the machine).
//! - Once `cancel()` returns, no expiry armed before it can reach the callback:
//!   expiries carry the generation they were computed under and are dropped at the
//!   fire gate when it changed.
//! - A callback may trigger or cancel its own instance.
//! - Cancelling the parent scope retires the instance: timers are dropped and later
//!   triggers are ignored, as after `destroy()`.
//! - Dropping the [`Backoff`] is the same as [`Backoff::destroy`].

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::core::status::Status;
use crate::error::BackoffError;
use crate::events::{Bus, Event, EventKind};
use crate::fsm::{Expiry, Machine, State};
use crate::policies::DelayPolicy;
use crate::recompute::RecomputeRef;

thread_local! {
    /// Instance whose callback is running on this thread (0 = none).
    static FIRING: Cell<usize> = const { Cell::new(0) };
}

/// State shared between the handle, trigger handles and the driver task.
struct Shared {
    name: Arc<str>,
    machine: Mutex<Machine>,
    /// Bumped on every cancel; expiries computed under an older value are stale.
    generation: AtomicU64,
    /// Held while the callback runs.
    gate: Mutex<()>,
    alive: AtomicBool,
    wake: Notify,
    /// Lifetime of the driver; a cancelled scope retires the instance.
    scope: CancellationToken,
    callback: RecomputeRef,
    bus: Option<Bus>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn id(&self) -> usize {
        self as *const Self as usize
    }

    fn publish(&self, ev: Event) {
        if let Some(bus) = &self.bus {
            bus.publish(ev.with_instance(Arc::clone(&self.name)));
        }
    }

    fn publish_all(&self, events: Vec<Event>) {
        events.into_iter().for_each(|ev| self.publish(ev));
    }

    /// Retires the instance if its scope was cancelled (scheduler shutdown).
    fn check_scope(&self) {
        if self.scope.is_cancelled() && self.retire() {
            debug!(instance = %self.name, "scope cancelled, instance retired");
        }
    }

    /// Cancels all timers and stops accepting triggers. Returns `false` if already retired.
    fn retire(&self) -> bool {
        if !self.alive.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.cancel();
        true
    }

    fn trigger(&self) -> bool {
        self.check_scope();

        let now = Instant::now();
        // Events are built under the lock so their `seq` follows the transitions.
        let (step, events) = {
            let mut machine = self.lock();
            // Checked under the lock: `retire()` resets the machine after clearing it.
            if !self.alive.load(Ordering::Acquire) {
                drop(machine);
                debug!(instance = %self.name, "trigger ignored, instance retired");
                return false;
            }
            let step = machine.trigger(now);

            // Hold-down is only armed in LONG_WAIT.
            let mut current = if step
                .expired
                .iter()
                .any(|e| matches!(e, Expiry::HoldDown { .. }))
            {
                State::LongWait
            } else {
                step.from
            };
            let mut events = Vec::with_capacity(step.expired.len() + 1);
            for expiry in &step.expired {
                let (next, ev) = self.stability_event(*expiry, current);
                current = next;
                events.extend(ev);
            }

            let mut ev = Event::new(EventKind::Triggered).with_state(step.to);
            if let Some(at) = step.wait {
                ev = ev.with_delay(at.saturating_duration_since(now));
            }
            events.push(ev);
            (step, events)
        };

        let delay = step.wait.map(|at| at.saturating_duration_since(now));
        if step.from == State::Quiet {
            debug!(instance = %self.name, ?delay, "burst started");
        } else {
            trace!(instance = %self.name, state = %step.to, ?delay, "trigger");
        }

        self.publish_all(events);
        self.wake.notify_one();
        true
    }

    /// Event for a learn or hold-down expiry, with the state right after it.
    fn stability_event(&self, expiry: Expiry, current: State) -> (State, Option<Event>) {
        match expiry {
            Expiry::Learn { .. } => {
                debug!(instance = %self.name, state = %current, "time to learn expired");
                let ev = Event::new(EventKind::LearnExpired).with_state(current);
                (current, Some(ev))
            }
            Expiry::HoldDown { .. } => {
                debug!(instance = %self.name, "hold-down expired, back to QUIET");
                let ev = Event::new(EventKind::Stable).with_state(State::Quiet);
                (State::Quiet, Some(ev))
            }
            Expiry::Wait { .. } => (current, None),
        }
    }

    /// Processes every deadline due at `now`, one at a time.
    ///
    /// Each expiry is taken out of the machine under the lock, so nothing armed
    /// before a `cancel()` is reported after it.
    fn expire(&self, now: Instant) {
        loop {
            let (expiry, generation, ev) = {
                let mut machine = self.lock();
                let before = machine.state();
                let Some(expiry) = machine.expire_next(now) else {
                    return;
                };
                let (_, ev) = self.stability_event(expiry, before);
                (expiry, self.generation.load(Ordering::Acquire), ev)
            };

            match expiry {
                Expiry::Wait { from, .. } => {
                    if !self.fire(generation, from) {
                        return;
                    }
                }
                _ => {
                    if let Some(ev) = ev {
                        self.publish(ev);
                    }
                }
            }
        }
    }

    /// Runs the callback unless the instance was cancelled since `generation`.
    fn fire(&self, generation: u64, from: State) -> bool {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if generation != self.generation.load(Ordering::Acquire) {
            debug!(instance = %self.name, "expiry dropped, instance was cancelled");
            self.publish(Event::new(EventKind::StaleExpiry));
            return false;
        }

        debug!(instance = %self.name, timer = from.as_label(), "running recomputation");
        FIRING.with(|f| f.set(self.id()));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.callback.recompute(&self.name)));
        FIRING.with(|f| f.set(0));

        if outcome.is_err() {
            error!(instance = %self.name, "recomputation callback panicked");
        }

        // The callback may have cancelled or re-triggered this instance.
        let ev = {
            let machine = self.lock();
            Event::new(EventKind::Fired)
                .with_state(machine.state())
                .with_reason(from.as_label())
        };
        self.publish(ev);
        true
    }

    fn cancel(&self) -> bool {
        let (before, ev) = {
            let mut machine = self.lock();
            let before = machine.state();
            let cancelled = machine.cancel();
            // Bumped even when idle: an expiry may already have been taken out of
            // the machine and be waiting for the gate.
            self.generation.fetch_add(1, Ordering::AcqRel);
            let ev = cancelled.then(|| {
                Event::new(EventKind::Cancelled)
                    .with_state(State::Quiet)
                    .with_reason(before.to_string())
            });
            (before, ev)
        };

        // Wait for an in-flight callback, unless we are that callback.
        if FIRING.with(|f| f.get()) != self.id() {
            drop(self.gate.lock().unwrap_or_else(PoisonError::into_inner));
        }
        self.wake.notify_one();

        match ev {
            Some(ev) => {
                debug!(instance = %self.name, was = %before, "cancelled");
                self.publish(ev);
                true
            }
            None => false,
        }
    }
}

/// Timer driver: sleeps until the next deadline, or until woken by a state change.
async fn drive(shared: Arc<Shared>) {
    let scope = shared.scope.clone();
    loop {
        let deadline = shared.lock().next_deadline();
        let sleep = async move {
            match deadline {
                Some(at) => time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = scope.cancelled() => break,
            _ = shared.wake.notified() => continue,
            _ = sleep => shared.expire(Instant::now()),
        }
    }
    shared.check_scope();
    trace!(instance = %shared.name, "timer driver stopped");
}

/// Builder for a [`Backoff`] instance.
pub struct BackoffBuilder {
    name: Arc<str>,
    policy: DelayPolicy,
    callback: RecomputeRef,
    bus: Option<Bus>,
    parent: Option<CancellationToken>,
}

impl BackoffBuilder {
    /// Publishes the instance's events on `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Ties the instance's lifetime to `token`: cancelling it stops the timers and
    /// retires the instance (later triggers are ignored).
    pub fn with_parent_token(mut self, token: CancellationToken) -> Self {
        self.parent = Some(token);
        self
    }

    /// Validates the policy and starts the instance in `QUIET` state.
    ///
    /// # Panics
    /// Must be called from within a tokio runtime (the timer driver is spawned).
    pub fn build(self) -> Result<Backoff, BackoffError> {
        self.policy.validate()?;

        let shared = Arc::new(Shared {
            name: self.name,
            machine: Mutex::new(Machine::new(self.policy)),
            generation: AtomicU64::new(0),
            gate: Mutex::new(()),
            alive: AtomicBool::new(true),
            wake: Notify::new(),
            scope: match self.parent {
                Some(parent) => parent.child_token(),
                None => CancellationToken::new(),
            },
            callback: self.callback,
            bus: self.bus,
        });
        let driver = tokio::spawn(drive(Arc::clone(&shared)));

        debug!(instance = %shared.name, policy = ?self.policy, "backoff created");
        Ok(Backoff { shared, driver })
    }
}

/// Owned SPF backoff instance.
///
/// Created with [`Backoff::new`] or [`Backoff::builder`]; torn down by
/// [`Backoff::destroy`] or by dropping it.
pub struct Backoff {
    shared: Arc<Shared>,
    driver: JoinHandle<()>,
}

impl Backoff {
    /// Starts building an instance.
    pub fn builder(
        name: impl Into<Arc<str>>,
        policy: DelayPolicy,
        callback: RecomputeRef,
    ) -> BackoffBuilder {
        BackoffBuilder {
            name: name.into(),
            policy,
            callback,
            bus: None,
            parent: None,
        }
    }

    /// Creates a standalone instance (no event bus).
    ///
    /// Fails with [`BackoffError::InvalidConfig`] if a duration exceeds
    /// [`MAX_DELAY`](crate::MAX_DELAY).
    ///
    /// # Panics
    /// Must be called from within a tokio runtime.
    pub fn new(
        name: impl Into<Arc<str>>,
        policy: DelayPolicy,
        callback: RecomputeRef,
    ) -> Result<Self, BackoffError> {
        Self::builder(name, policy, callback).build()
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn policy(&self) -> DelayPolicy {
        *self.shared.lock().policy()
    }

    /// Signals a change. Never fails and never runs the callback synchronously.
    ///
    /// Ignored once the parent scope (the scheduler) has shut down.
    pub fn trigger(&self) {
        self.shared.trigger();
    }

    /// Cancels every pending timer and returns to `QUIET` without running the callback.
    ///
    /// Synchronous: once it returns, no timer armed before the call will reach the
    /// callback. If the callback is running on another thread, this waits for it to
    /// return. Calling it on an idle instance is a no-op.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// Cancels all timers and stops the driver. Same as dropping the instance.
    pub fn destroy(self) {
        drop(self);
    }

    /// Returns a cloneable handle for additional event sources.
    pub fn trigger_handle(&self) -> TriggerHandle {
        TriggerHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn state(&self) -> State {
        self.shared.check_scope();
        self.shared.lock().state()
    }

    /// Time left before the callback runs, if a run is pending.
    pub fn remaining(&self) -> Option<Duration> {
        self.shared.check_scope();
        let now = Instant::now();
        self.shared
            .lock()
            .wait_deadline()
            .map(|at| at.saturating_duration_since(now))
    }

    /// Full diagnostics snapshot.
    pub fn status(&self) -> Status {
        self.shared.check_scope();
        let machine = self.shared.lock();
        Status::capture(Arc::clone(&self.shared.name), &machine, Instant::now())
    }
}

impl Drop for Backoff {
    fn drop(&mut self) {
        self.shared.retire();
        self.shared.scope.cancel();
        self.driver.abort();

        debug!(instance = %self.shared.name, "backoff destroyed");
        self.shared.publish(Event::new(EventKind::Destroyed));
    }
}

impl std::fmt::Debug for Backoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backoff")
            .field("name", &self.shared.name)
            .field("state", &self.shared.lock().state())
            .finish_non_exhaustive()
    }
}

/// Cloneable trigger-only handle to a [`Backoff`].
///
/// Does not keep the instance alive; triggers after destruction are ignored.
#[derive(Clone)]
pub struct TriggerHandle {
    shared: Weak<Shared>,
}

impl TriggerHandle {
    /// Signals a change. Returns `false` when the instance no longer exists.
    pub fn trigger(&self) -> bool {
        match self.shared.upgrade() {
            Some(shared) => shared.trigger(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recompute::RecomputeFn;
    use std::sync::OnceLock;

    type Fires = Arc<Mutex<Vec<u64>>>;

    fn recorder(t0: Instant) -> (RecomputeRef, Fires) {
        let fires: Fires = Arc::new(Mutex::new(Vec::new()));
        let sink = fires.clone();
        let cb: RecomputeRef = RecomputeFn::arc(move |_: &str| {
            let ms = Instant::now().duration_since(t0).as_millis() as u64;
            sink.lock().unwrap().push(ms);
        });
        (cb, fires)
    }

    fn fired(fires: &Fires) -> Vec<u64> {
        fires.lock().unwrap().clone()
    }

    async fn sleep_to(t0: Instant, ms: u64) {
        time::sleep_until(t0 + Duration::from_millis(ms)).await;
    }

    fn rfc_policy() -> DelayPolicy {
        DelayPolicy::from_millis(50, 200, 5000, 10_000, 20_000)
    }

    #[tokio::test(start_paused = true)]
    async fn test_isolated_trigger() {
        let t0 = Instant::now();
        let (cb, fires) = recorder(t0);
        let backoff = Backoff::new("T", rfc_policy(), cb).unwrap();
        assert_eq!(backoff.state(), State::Quiet);

        backoff.trigger();
        assert_eq!(backoff.state(), State::ShortWait);
        assert_eq!(backoff.remaining(), Some(Duration::from_millis(50)));

        sleep_to(t0, 49).await;
        assert!(fired(&fires).is_empty());

        sleep_to(t0, 51).await;
        assert_eq!(fired(&fires), vec![50]);
        assert_eq!(backoff.state(), State::LongWait);
        assert_eq!(backoff.remaining(), None);

        sleep_to(t0, 10_049).await;
        assert_eq!(backoff.state(), State::LongWait);
        sleep_to(t0, 10_051).await;
        assert_eq!(backoff.state(), State::Quiet);
        assert_eq!(fired(&fires), vec![50]);

        // Fast path is restored.
        backoff.trigger();
        assert_eq!(backoff.remaining(), Some(Duration::from_millis(50)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_storm() {
        let t0 = Instant::now();
        let (cb, fires) = recorder(t0);
        let backoff = Backoff::new("T", rfc_policy(), cb).unwrap();

        let mut triggers = vec![0, 100, 150, 300, 600];
        triggers.extend((700..=40_000).step_by(100));
        for t in triggers {
            sleep_to(t0, t).await;
            backoff.trigger();
        }
        sleep_to(t0, 60_000).await;

        let fires = fired(&fires);
        assert_eq!(fires[0], 50);
        // Pending wait at the learn boundary (t=20000) is the only grace cycle.
        assert_eq!(fires[1], 24_900);
        for pair in fires[1..].windows(2) {
            assert!(pair[1] - pair[0] >= 5000, "runs too close: {pair:?}");
        }
        assert!(*fires.last().unwrap() <= 45_000);
        assert_eq!(backoff.state(), State::Quiet);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_in_short_wait_suppresses_callback() {
        let t0 = Instant::now();
        let (cb, fires) = recorder(t0);
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let backoff = Backoff::builder("T", rfc_policy(), cb)
            .with_bus(bus)
            .build()
            .unwrap();

        backoff.trigger();
        sleep_to(t0, 10).await;
        backoff.cancel();
        backoff.cancel();
        assert_eq!(backoff.state(), State::Quiet);

        sleep_to(t0, 30_000).await;
        assert!(fired(&fires).is_empty());

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|ev| ev.kind)
            .collect();
        assert_eq!(kinds, vec![EventKind::Triggered, EventKind::Cancelled]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_in_long_wait_suppresses_callback() {
        let t0 = Instant::now();
        let (cb, fires) = recorder(t0);
        let backoff = Backoff::new("T", rfc_policy(), cb).unwrap();

        backoff.trigger();
        sleep_to(t0, 100).await;
        backoff.trigger();
        assert_eq!(backoff.state(), State::LongWait);
        assert_eq!(backoff.remaining(), Some(Duration::from_millis(5000)));

        backoff.cancel();
        sleep_to(t0, 30_000).await;
        assert_eq!(fired(&fires), vec![50]);
        assert_eq!(backoff.status().wait, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_stops_timers_and_handles() {
        let t0 = Instant::now();
        let (cb, fires) = recorder(t0);
        let backoff = Backoff::new("T", rfc_policy(), cb).unwrap();
        let handle = backoff.trigger_handle();

        assert!(handle.trigger());
        backoff.destroy();
        assert!(!handle.trigger());

        sleep_to(t0, 30_000).await;
        assert!(fired(&fires).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_handle_triggers_same_instance() {
        let t0 = Instant::now();
        let (cb, fires) = recorder(t0);
        let backoff = Backoff::new("T", rfc_policy(), cb).unwrap();
        let a = backoff.trigger_handle();
        let b = a.clone();

        a.trigger();
        sleep_to(t0, 10).await;
        b.trigger();
        sleep_to(t0, 300).await;

        assert_eq!(fired(&fires), vec![210]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delays_fire_once_and_settle() {
        let t0 = Instant::now();
        let (cb, fires) = recorder(t0);
        let backoff = Backoff::new("T", DelayPolicy::from_millis(0, 0, 0, 0, 0), cb).unwrap();

        backoff.trigger();
        assert!(fired(&fires).is_empty());
        sleep_to(t0, 1).await;

        assert_eq!(fired(&fires), vec![0]);
        assert_eq!(backoff.state(), State::Quiet);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_may_retrigger_own_instance() {
        let t0 = Instant::now();
        let fires: Fires = Arc::new(Mutex::new(Vec::new()));
        let cell: Arc<OnceLock<TriggerHandle>> = Arc::new(OnceLock::new());

        let sink = fires.clone();
        let handle_cell = cell.clone();
        let cb = RecomputeFn::arc(move |_: &str| {
            let mut fires = sink.lock().unwrap();
            fires.push(Instant::now().duration_since(t0).as_millis() as u64);
            if fires.len() == 1 {
                if let Some(handle) = handle_cell.get() {
                    handle.trigger();
                }
            }
        });
        let backoff = Backoff::new("T", rfc_policy(), cb).unwrap();
        let _ = cell.set(backoff.trigger_handle());

        backoff.trigger();
        sleep_to(t0, 20_000).await;

        assert_eq!(fired(&fires), vec![50, 5050]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_may_cancel_own_instance() {
        let t0 = Instant::now();
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let cell: Arc<OnceLock<Backoff>> = Arc::new(OnceLock::new());

        let me = cell.clone();
        let cb = RecomputeFn::arc(move |_: &str| {
            if let Some(backoff) = me.get() {
                backoff.cancel();
            }
        });
        let backoff = Backoff::builder("T", rfc_policy(), cb)
            .with_bus(bus)
            .build()
            .unwrap();
        let _ = cell.set(backoff);

        cell.get().unwrap().trigger();
        sleep_to(t0, 100).await;
        assert_eq!(cell.get().unwrap().state(), State::Quiet);

        let events: Vec<Event> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        let kinds: Vec<EventKind> = events.iter().map(|ev| ev.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::Triggered, EventKind::Cancelled, EventKind::Fired]
        );
        assert_eq!(events[2].state, Some(State::Quiet));
    }

    #[tokio::test(start_paused = true)]
    async fn test_self_cancel_drops_expiries_already_due() {
        let t0 = Instant::now();
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let cell: Arc<OnceLock<Backoff>> = Arc::new(OnceLock::new());

        let me = cell.clone();
        let cb = RecomputeFn::arc(move |_: &str| {
            if let Some(backoff) = me.get() {
                backoff.cancel();
            }
        });
        // Learn, wait and hold-down all expire at the same instant.
        let backoff = Backoff::builder("T", DelayPolicy::from_millis(0, 0, 0, 0, 0), cb)
            .with_bus(bus)
            .build()
            .unwrap();
        let _ = cell.set(backoff);

        cell.get().unwrap().trigger();
        sleep_to(t0, 10).await;

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|ev| ev.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Triggered,
                EventKind::LearnExpired,
                EventKind::Cancelled,
                EventKind::Fired,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_scope_cancel_retires_instance() {
        let t0 = Instant::now();
        let (cb, fires) = recorder(t0);
        let parent = CancellationToken::new();
        let backoff = Backoff::builder("T", rfc_policy(), cb)
            .with_parent_token(parent.clone())
            .build()
            .unwrap();
        let handle = backoff.trigger_handle();

        backoff.trigger();
        parent.cancel();
        assert_eq!(backoff.state(), State::Quiet);
        assert_eq!(backoff.remaining(), None);

        backoff.trigger();
        assert!(!handle.trigger());
        sleep_to(t0, 60_000).await;

        assert!(fired(&fires).is_empty());
        assert_eq!(backoff.state(), State::Quiet);
        assert_eq!(backoff.status().wait, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flushed_expiry_is_ordered_before_trigger() {
        let t0 = Instant::now();
        let (cb, _) = recorder(t0);
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let backoff = Backoff::builder("T", rfc_policy(), cb)
            .with_bus(bus)
            .build()
            .unwrap();

        backoff.trigger();
        sleep_to(t0, 10_050).await;
        backoff.trigger();

        let events: Vec<Event> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(events.windows(2).all(|w| w[0].seq < w[1].seq));
        let tail: Vec<(EventKind, Option<State>)> = events[events.len() - 2..]
            .iter()
            .map(|ev| (ev.kind, ev.state))
            .collect();
        assert_eq!(
            tail,
            vec![
                (EventKind::Stable, Some(State::Quiet)),
                (EventKind::Triggered, Some(State::ShortWait)),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_waits_for_running_callback() {
        let started = Arc::new(AtomicBool::new(false));
        let done = Arc::new(AtomicBool::new(false));
        let (s, d) = (started.clone(), done.clone());
        let cb: RecomputeRef = RecomputeFn::arc(move |_: &str| {
            s.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(200));
            d.store(true, Ordering::SeqCst);
        });
        let backoff =
            Backoff::new("T", DelayPolicy::from_millis(0, 0, 5000, 10_000, 500), cb).unwrap();

        backoff.trigger();
        while !started.load(Ordering::SeqCst) {
            time::sleep(Duration::from_millis(1)).await;
        }
        backoff.cancel();

        assert!(done.load(Ordering::SeqCst));
        assert_eq!(backoff.state(), State::Quiet);
        assert_eq!(backoff.remaining(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_expiry_is_swallowed() {
        let t0 = Instant::now();
        let (cb, fires) = recorder(t0);
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let backoff = Backoff::builder("T", rfc_policy(), cb)
            .with_bus(bus)
            .build()
            .unwrap();

        let generation = backoff.shared.generation.load(Ordering::Acquire);
        backoff.cancel();
        assert!(!backoff.shared.fire(generation, State::ShortWait));

        assert!(fired(&fires).is_empty());
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::StaleExpiry);
        assert_eq!(ev.instance.as_deref(), Some("T"));
    }

    #[tokio::test]
    async fn test_invalid_policy_is_rejected() {
        let cb = RecomputeFn::arc(|_: &str| {});
        let policy = DelayPolicy::default().with_init_delay(Duration::from_secs(u32::MAX as u64));
        let err = Backoff::new("T", policy, cb).unwrap_err();
        assert_eq!(err.as_label(), "backoff_invalid_config");
    }
}

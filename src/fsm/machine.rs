//! # Pure SPF delay state machine.
//!
//! [`Machine`] holds the state and the three timer deadlines of one backoff
//! instance. It never sleeps and never calls anything: callers feed it the current
//! instant and it reports what happened. The async driver in `core::instance`
//! sleeps until [`Machine::next_deadline`] and turns [`Expiry::Wait`] into a
//! callback invocation.
//!
//! ## Transitions
//! ```text
//!            Trigger                      wait expiry (callback)
//!   QUIET ───────────► SHORT_WAIT ─────────────────────────────► LONG_WAIT ──┐
//!     ▲   wait=init      │  ▲ Trigger: wait=max(wait, now+short)     │  ▲       │ Trigger: drop hold-down,
//!     │   learn=ttl      └──┘ (frozen once learned)                  │  └───────┘ wait=max(wait, now+long)
//!     │                                                              │            (kept as-is once learned)
//!     └──────────────────────── hold-down expiry ◄───────────────────┘
//!                                                  wait expiry: callback, hold-down=holddown
//! ```
//!
//! ## Rules
//! - At most one wait deadline exists; rearming overwrites it.
//! - A wait deadline is never moved earlier by a trigger.
//! - Once the learn timer expired, triggers stop extending a pending wait; in
//!   `LONG_WAIT` a trigger with nothing pending arms exactly one more `long_delay`.
//! - Deadlines are inclusive: an expiry at `at` is due when `now >= at`.
//! - Follow-up timers are armed from the expired deadline, not from `now`.

use tokio::time::Instant;

use super::state::State;
use crate::policies::DelayPolicy;

/// One timer expiry processed by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// The learn window closed; waits are no longer extended.
    Learn {
        /// Deadline that expired.
        at: Instant,
    },
    /// The wait timer expired: the recomputation must run.
    Wait {
        /// Deadline that expired.
        at: Instant,
        /// State the timer was armed in (`SHORT_WAIT` or `LONG_WAIT`).
        from: State,
    },
    /// No trigger during hold-down: back to `QUIET`.
    HoldDown {
        /// Deadline that expired.
        at: Instant,
    },
}

/// Result of feeding one trigger to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Stability timers (learn, hold-down) that were due and got flushed first.
    pub expired: Vec<Expiry>,
    /// State observed by the trigger (after flushing).
    pub from: State,
    /// State after the trigger.
    pub to: State,
    /// Pending wait deadline after the trigger.
    pub wait: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Learn,
    Wait,
    HoldDown,
}

/// State and timers of one instance.
///
/// The policy must have been validated (see [`DelayPolicy::validate`]) so that
/// deadline arithmetic cannot overflow.
#[derive(Debug, Clone)]
pub struct Machine {
    policy: DelayPolicy,
    state: State,

    wait: Option<Instant>,
    hold_down: Option<Instant>,
    learn: Option<Instant>,
    learned: bool,

    first_trigger: Option<Instant>,
    last_trigger: Option<Instant>,
    last_fire: Option<Instant>,
}

impl Machine {
    /// Creates a machine in `QUIET` state.
    pub fn new(policy: DelayPolicy) -> Self {
        Self {
            policy,
            state: State::Quiet,
            wait: None,
            hold_down: None,
            learn: None,
            learned: false,
            first_trigger: None,
            last_trigger: None,
            last_fire: None,
        }
    }

    pub fn policy(&self) -> &DelayPolicy {
        &self.policy
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Deadline of the timer that will invoke the callback.
    pub fn wait_deadline(&self) -> Option<Instant> {
        self.wait
    }

    pub fn hold_down_deadline(&self) -> Option<Instant> {
        self.hold_down
    }

    pub fn learn_deadline(&self) -> Option<Instant> {
        self.learn
    }

    /// Whether the learn window of the current burst has closed.
    pub fn learned(&self) -> bool {
        self.learned
    }

    pub fn first_trigger(&self) -> Option<Instant> {
        self.first_trigger
    }

    pub fn last_trigger(&self) -> Option<Instant> {
        self.last_trigger
    }

    pub fn last_fire(&self) -> Option<Instant> {
        self.last_fire
    }

    /// Earliest armed deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.earliest(&[Timer::Learn, Timer::Wait, Timer::HoldDown])
            .map(|(_, at)| at)
    }

    /// Handles a trigger observed at `now`.
    ///
    /// Due stability timers (learn, hold-down) are flushed first so that the
    /// outcome does not depend on whether the driver already woke up. The wait
    /// timer is never consumed here: the callback only runs from [`Machine::advance`].
    pub fn trigger(&mut self, now: Instant) -> Step {
        let expired = self.flush(now, &[Timer::Learn, Timer::HoldDown]);
        let from = self.state;
        self.last_trigger = Some(now);

        match self.state {
            State::Quiet => {
                self.first_trigger = Some(now);
                self.learned = false;
                self.hold_down = None;
                self.learn = Some(now + self.policy.time_to_learn);
                self.wait = Some(now + self.policy.init_delay);
                self.state = State::ShortWait;
            }
            State::ShortWait => {
                let candidate = now + self.policy.short_delay;
                self.wait = Some(if self.learned {
                    self.wait.unwrap_or(candidate)
                } else {
                    later(self.wait, candidate)
                });
            }
            State::LongWait => {
                let candidate = now + self.policy.long_delay;
                self.hold_down = None;
                self.wait = Some(if self.learned {
                    self.wait.unwrap_or(candidate)
                } else {
                    later(self.wait, candidate)
                });
            }
        }

        Step {
            expired,
            from,
            to: self.state,
            wait: self.wait,
        }
    }

    /// Processes every timer due at `now`, in deadline order.
    ///
    /// Ties are resolved learn, then wait, then hold-down.
    pub fn advance(&mut self, now: Instant) -> Vec<Expiry> {
        std::iter::from_fn(|| self.expire_next(now)).collect()
    }

    /// Processes the earliest timer due at `now`, if any.
    ///
    /// Same order as [`Machine::advance`], one expiry at a time.
    pub fn expire_next(&mut self, now: Instant) -> Option<Expiry> {
        self.pop_due(now, &[Timer::Learn, Timer::Wait, Timer::HoldDown])
    }

    /// Drops every timer and returns to `QUIET`.
    ///
    /// Returns `false` when there was nothing to cancel.
    pub fn cancel(&mut self) -> bool {
        let busy = self.state != State::Quiet
            || self.wait.is_some()
            || self.hold_down.is_some()
            || self.learn.is_some();
        self.reset();
        busy
    }

    fn flush(&mut self, now: Instant, timers: &[Timer]) -> Vec<Expiry> {
        std::iter::from_fn(|| self.pop_due(now, timers)).collect()
    }

    fn pop_due(&mut self, now: Instant, timers: &[Timer]) -> Option<Expiry> {
        let (timer, at) = self.earliest(timers)?;
        (at <= now).then(|| self.expire(timer, at))
    }

    fn expire(&mut self, timer: Timer, at: Instant) -> Expiry {
        match timer {
            Timer::Learn => {
                self.learn = None;
                self.learned = true;
                Expiry::Learn { at }
            }
            Timer::Wait => {
                let from = self.state;
                self.wait = None;
                self.last_fire = Some(at);
                self.hold_down = Some(at + self.policy.hold_down);
                self.state = State::LongWait;
                Expiry::Wait { at, from }
            }
            Timer::HoldDown => {
                self.reset();
                Expiry::HoldDown { at }
            }
        }
    }

    fn earliest(&self, timers: &[Timer]) -> Option<(Timer, Instant)> {
        timers
            .iter()
            .filter_map(|&timer| {
                let at = match timer {
                    Timer::Learn => self.learn,
                    Timer::Wait => self.wait,
                    Timer::HoldDown => self.hold_down,
                }?;
                Some((timer, at))
            })
            .min_by_key(|&(_, at)| at)
    }

    fn reset(&mut self) {
        self.state = State::Quiet;
        self.wait = None;
        self.hold_down = None;
        self.learn = None;
        self.learned = false;
        self.first_trigger = None;
    }
}

fn later(current: Option<Instant>, candidate: Instant) -> Instant {
    current.map_or(candidate, |at| at.max(candidate))
}

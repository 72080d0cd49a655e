//! # Per-level backoff instances of one IS-IS area.
//!
//! [`LevelBackoffs`] owns at most one [`Backoff`] per [`Level`] and replays the
//! configuration life cycle of a routing daemon: enabling the delay algorithm
//! (re)creates both instances, disabling it destroys them. Instances are named
//! `"<area> L1"` and `"<area> L2"`.
//!
//! ## Rules
//! - `configure()` validates the policy before touching existing instances: an invalid
//!   policy leaves the previous configuration running.
//! - Reconfiguring destroys the old instances first; pending runs are dropped.
//! - Triggers for an unconfigured level are ignored and reported as `false`.

use std::fmt;

use tracing::debug;

use crate::core::instance::Backoff;
use crate::core::scheduler::Scheduler;
use crate::error::BackoffError;
use crate::policies::DelayPolicy;
use crate::recompute::RecomputeRef;

/// IS-IS routing level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    L1,
    L2,
}

impl Level {
    pub const ALL: [Level; 2] = [Level::L1, Level::L2];

    fn index(self) -> usize {
        match self {
            Level::L1 => 0,
            Level::L2 => 1,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::L1 => "L1",
            Level::L2 => "L2",
        })
    }
}

/// Backoff instances of one area, one per level.
#[derive(Debug)]
pub struct LevelBackoffs {
    area: String,
    levels: [Option<Backoff>; 2],
}

impl LevelBackoffs {
    /// Creates an unconfigured set for `area`.
    pub fn new(area: impl Into<String>) -> Self {
        Self {
            area: area.into(),
            levels: [None, None],
        }
    }

    pub fn area(&self) -> &str {
        &self.area
    }

    /// (Re)creates both level instances with `policy`.
    pub fn configure(
        &mut self,
        scheduler: &Scheduler,
        policy: DelayPolicy,
        callback: RecomputeRef,
    ) -> Result<(), BackoffError> {
        policy.validate()?;

        for level in Level::ALL {
            if let Some(old) = self.levels[level.index()].take() {
                old.destroy();
            }
            let name = format!("{} {}", self.area, level);
            let backoff = scheduler.backoff(name, policy, callback.clone())?;
            self.levels[level.index()] = Some(backoff);
        }
        debug!(area = %self.area, ?policy, "spf delay configured");
        Ok(())
    }

    /// Destroys both instances. Returns `false` if nothing was configured.
    pub fn unconfigure(&mut self) -> bool {
        let mut any = false;
        for slot in &mut self.levels {
            if let Some(backoff) = slot.take() {
                backoff.destroy();
                any = true;
            }
        }
        if any {
            debug!(area = %self.area, "spf delay unconfigured");
        }
        any
    }

    pub fn is_configured(&self) -> bool {
        self.levels.iter().any(Option::is_some)
    }

    pub fn get(&self, level: Level) -> Option<&Backoff> {
        self.levels[level.index()].as_ref()
    }

    /// Routes a topology change to `level`. Returns `false` if the level has no instance.
    pub fn trigger(&self, level: Level) -> bool {
        match self.get(level) {
            Some(backoff) => {
                backoff.trigger();
                true
            }
            None => {
                debug!(area = %self.area, %level, "trigger ignored, spf delay not configured");
                false
            }
        }
    }

    /// Cancels pending timers on every configured level.
    pub fn cancel_all(&self) {
        self.levels.iter().flatten().for_each(Backoff::cancel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SchedulerConfig;
    use crate::fsm::State;
    use crate::recompute::RecomputeFn;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time;

    fn recorder() -> (RecomputeRef, Arc<Mutex<Vec<String>>>) {
        let runs = Arc::new(Mutex::new(Vec::new()));
        let sink = runs.clone();
        let cb: RecomputeRef = RecomputeFn::arc(move |instance: &str| {
            sink.lock().unwrap().push(instance.to_string());
        });
        (cb, runs)
    }

    #[tokio::test(start_paused = true)]
    async fn test_levels_are_named_and_routed() {
        let scheduler = Scheduler::new(SchedulerConfig::default(), Vec::new());
        let (cb, runs) = recorder();
        let mut levels = LevelBackoffs::new("area1");
        assert!(!levels.trigger(Level::L1));

        levels.configure(&scheduler, DelayPolicy::default(), cb).unwrap();
        assert!(levels.is_configured());
        assert_eq!(levels.get(Level::L2).map(Backoff::name), Some("area1 L2"));

        assert!(levels.trigger(Level::L2));
        time::sleep(Duration::from_millis(100)).await;

        assert_eq!(*runs.lock().unwrap(), vec!["area1 L2".to_string()]);
        assert_eq!(levels.get(Level::L1).unwrap().state(), State::Quiet);
        assert_eq!(levels.get(Level::L2).unwrap().state(), State::LongWait);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconfigure_drops_pending_runs() {
        let scheduler = Scheduler::new(SchedulerConfig::default(), Vec::new());
        let (cb, runs) = recorder();
        let mut levels = LevelBackoffs::new("area1");
        levels.configure(&scheduler, DelayPolicy::default(), cb.clone()).unwrap();

        levels.trigger(Level::L1);
        let slower = DelayPolicy::default().with_init_delay(Duration::from_millis(500));
        levels.configure(&scheduler, slower, cb).unwrap();
        assert_eq!(levels.get(Level::L1).unwrap().state(), State::Quiet);
        assert_eq!(levels.get(Level::L1).unwrap().policy(), slower);

        time::sleep(Duration::from_secs(1)).await;
        assert!(runs.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_policy_keeps_previous_configuration() {
        let scheduler = Scheduler::new(SchedulerConfig::default(), Vec::new());
        let (cb, _) = recorder();
        let mut levels = LevelBackoffs::new("area1");
        levels.configure(&scheduler, DelayPolicy::default(), cb.clone()).unwrap();

        let bad = DelayPolicy::default().with_long_delay(Duration::from_secs(4_000_000));
        assert!(levels.configure(&scheduler, bad, cb).is_err());
        assert_eq!(
            levels.get(Level::L1).unwrap().policy(),
            DelayPolicy::default()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfigure_and_cancel_all() {
        let scheduler = Scheduler::new(SchedulerConfig::default(), Vec::new());
        let (cb, runs) = recorder();
        let mut levels = LevelBackoffs::new("area1");
        levels.configure(&scheduler, DelayPolicy::default(), cb).unwrap();

        levels.trigger(Level::L1);
        levels.trigger(Level::L2);
        levels.cancel_all();
        time::sleep(Duration::from_secs(1)).await;
        assert!(runs.lock().unwrap().is_empty());

        assert!(levels.unconfigure());
        assert!(!levels.unconfigure());
        assert!(!levels.is_configured());
        assert!(!levels.trigger(Level::L1));
    }
}

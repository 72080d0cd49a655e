//! # Read-only diagnostics snapshot of a backoff instance.
//!
//! ## Example output
//! ```text
//! IETF SPF delay algorithm (area1 L1)
//!   Current state:     LONG_WAIT
//!   Init timer:        50 msec
//!   Short timer:       200 msec
//!   Long timer:        5000 msec
//!   Holddown timer:    10000 msec
//!     Still runs for 9950 msec
//!   TimeToLearn timer: 500 msec
//!     Inactive (learned)
//!   Pending run in:    none
//!   First event:       0.050s ago
//!   Last event:        0.050s ago
//!   Last run:          0.000s ago
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::fsm::{Machine, State};
use crate::policies::DelayPolicy;

/// Point-in-time view of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub name: Arc<str>,
    pub state: State,
    pub policy: DelayPolicy,
    /// Time left before the callback runs.
    pub wait: Option<Duration>,
    /// Time left on the hold-down timer.
    pub hold_down: Option<Duration>,
    /// Time left on the learn timer.
    pub learn: Option<Duration>,
    /// Whether the learn window of the current burst has closed.
    pub learned: bool,
    pub since_first_trigger: Option<Duration>,
    pub since_last_trigger: Option<Duration>,
    pub since_last_fire: Option<Duration>,
}

impl Status {
    pub(crate) fn capture(name: Arc<str>, machine: &Machine, now: Instant) -> Self {
        let left = |at: Option<Instant>| at.map(|at| at.saturating_duration_since(now));
        let ago = |at: Option<Instant>| at.map(|at| now.saturating_duration_since(at));

        Self {
            name,
            state: machine.state(),
            policy: *machine.policy(),
            wait: left(machine.wait_deadline()),
            hold_down: left(machine.hold_down_deadline()),
            learn: left(machine.learn_deadline()),
            learned: machine.learned(),
            since_first_trigger: ago(machine.first_trigger()),
            since_last_trigger: ago(machine.last_trigger()),
            since_last_fire: ago(machine.last_fire()),
        }
    }
}

fn write_timer(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    configured: Duration,
    left: Option<Duration>,
    inactive: &str,
) -> fmt::Result {
    writeln!(f, "  {label:<19}{} msec", configured.as_millis())?;
    match left {
        Some(d) => writeln!(f, "    Still runs for {} msec", d.as_millis()),
        None => writeln!(f, "    {inactive}"),
    }
}

fn write_ago(f: &mut fmt::Formatter<'_>, label: &str, ago: Option<Duration>) -> fmt::Result {
    match ago {
        Some(d) => writeln!(f, "  {label:<19}{:.3}s ago", d.as_secs_f64()),
        None => writeln!(f, "  {label:<19}never"),
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IETF SPF delay algorithm ({})", self.name)?;
        writeln!(f, "  {:<19}{}", "Current state:", self.state)?;
        writeln!(f, "  {:<19}{} msec", "Init timer:", self.policy.init_delay.as_millis())?;
        writeln!(f, "  {:<19}{} msec", "Short timer:", self.policy.short_delay.as_millis())?;
        writeln!(f, "  {:<19}{} msec", "Long timer:", self.policy.long_delay.as_millis())?;
        write_timer(f, "Holddown timer:", self.policy.hold_down, self.hold_down, "Inactive")?;
        let learn_inactive = if self.learned {
            "Inactive (learned)"
        } else {
            "Inactive"
        };
        write_timer(
            f,
            "TimeToLearn timer:",
            self.policy.time_to_learn,
            self.learn,
            learn_inactive,
        )?;
        match self.wait {
            Some(d) => writeln!(f, "  {:<19}{} msec", "Pending run in:", d.as_millis())?,
            None => writeln!(f, "  {:<19}none", "Pending run in:")?,
        }
        write_ago(f, "First event:", self.since_first_trigger)?;
        write_ago(f, "Last event:", self.since_last_trigger)?;
        write_ago(f, "Last run:", self.since_last_fire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_in_short_wait() {
        let t0 = Instant::now();
        let mut machine = Machine::new(DelayPolicy::from_millis(50, 200, 5000, 10_000, 500));
        machine.trigger(t0);

        let status = Status::capture("a L1".into(), &machine, t0 + Duration::from_millis(20));
        assert_eq!(status.state, State::ShortWait);
        assert_eq!(status.wait, Some(Duration::from_millis(30)));
        assert_eq!(status.learn, Some(Duration::from_millis(480)));
        assert_eq!(status.hold_down, None);
        assert_eq!(status.since_last_trigger, Some(Duration::from_millis(20)));
        assert_eq!(status.since_last_fire, None);

        let text = status.to_string();
        assert!(text.starts_with("IETF SPF delay algorithm (a L1)\n"));
        assert!(text.contains("Current state:     SHORT_WAIT"));
        assert!(text.contains("Still runs for 480 msec"));
        assert!(text.contains("Pending run in:    30 msec"));
        assert!(text.contains("Last run:          never"));
    }

    #[test]
    fn test_quiet_instance_shows_inactive_timers() {
        let machine = Machine::new(DelayPolicy::default());
        let status = Status::capture("idle".into(), &machine, Instant::now());

        assert_eq!(status.state, State::Quiet);
        let text = status.to_string();
        assert!(text.contains("Holddown timer:    10000 msec\n    Inactive\n"));
        assert!(text.contains("Pending run in:    none"));
    }
}

use std::fmt;

/// State of a backoff instance.
///
/// `QUIET` is the initial state and the only one with no timer armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum State {
    /// No recent trigger activity.
    #[default]
    Quiet,
    /// A burst started; waiting `init_delay` / `short_delay` before the first run.
    ShortWait,
    /// Triggers persisted past the first run; runs are spaced by `long_delay`.
    LongWait,
}

impl State {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            State::Quiet => "quiet",
            State::ShortWait => "short_wait",
            State::LongWait => "long_wait",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Quiet => "QUIET",
            State::ShortWait => "SHORT_WAIT",
            State::LongWait => "LONG_WAIT",
        };
        f.write_str(s)
    }
}

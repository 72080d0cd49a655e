//! # Delay policy for the SPF backoff state machine.
//!
//! [`DelayPolicy`] groups the five durations that drive the algorithm:
//! - [`DelayPolicy::init_delay`] wait used for the first trigger of a quiet period;
//! - [`DelayPolicy::short_delay`] wait used while triggers keep arriving in `SHORT_WAIT`;
//! - [`DelayPolicy::long_delay`] wait used once the instance is in `LONG_WAIT`;
//! - [`DelayPolicy::hold_down`] quiet period required before going back to `QUIET`;
//! - [`DelayPolicy::time_to_learn`] how long a burst may keep extending the wait.
//!
//! Zero is valid everywhere and means "immediately" for that phase. Relationships
//! between the values (e.g. `init <= short <= long`) are *not* enforced; picking sane
//! values is the operator's job. The only check is the [`MAX_DELAY`] upper bound.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use spf_backoff::DelayPolicy;
//!
//! let policy = DelayPolicy::from_millis(50, 200, 5000, 10_000, 20_000);
//! assert_eq!(policy.init_delay, Duration::from_millis(50));
//! assert!(policy.validate().is_ok());
//!
//! let too_long = policy.with_long_delay(Duration::from_secs(60 * 60 * 24 * 30));
//! assert!(too_long.validate().is_err());
//! ```

use std::time::Duration;

use crate::error::BackoffError;

/// Largest delay accepted by the scheduler (2^31 ms, a little under 25 days).
pub const MAX_DELAY: Duration = Duration::from_millis(1 << 31);

/// Durations of the IETF SPF delay algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelayPolicy {
    /// Delay used while in `QUIET` state.
    pub init_delay: Duration,
    /// Delay used while in `SHORT_WAIT` state.
    pub short_delay: Duration,
    /// Delay used while in `LONG_WAIT` state.
    pub long_delay: Duration,
    /// Time with no events before the domain is considered stable.
    pub hold_down: Duration,
    /// Maximum time needed to learn all events related to a single failure.
    pub time_to_learn: Duration,
}

impl Default for DelayPolicy {
    /// Returns a policy with:
    /// - `init_delay = 50ms`;
    /// - `short_delay = 200ms`;
    /// - `long_delay = 5s`;
    /// - `hold_down = 10s`;
    /// - `time_to_learn = 500ms`.
    fn default() -> Self {
        Self {
            init_delay: Duration::from_millis(50),
            short_delay: Duration::from_millis(200),
            long_delay: Duration::from_millis(5000),
            hold_down: Duration::from_millis(10_000),
            time_to_learn: Duration::from_millis(500),
        }
    }
}

impl DelayPolicy {
    /// Creates a policy from the five durations, in algorithm order.
    pub fn new(
        init_delay: Duration,
        short_delay: Duration,
        long_delay: Duration,
        hold_down: Duration,
        time_to_learn: Duration,
    ) -> Self {
        Self {
            init_delay,
            short_delay,
            long_delay,
            hold_down,
            time_to_learn,
        }
    }

    /// Same as [`DelayPolicy::new`] with values in milliseconds.
    pub fn from_millis(
        init_delay: u64,
        short_delay: u64,
        long_delay: u64,
        hold_down: u64,
        time_to_learn: u64,
    ) -> Self {
        Self::new(
            Duration::from_millis(init_delay),
            Duration::from_millis(short_delay),
            Duration::from_millis(long_delay),
            Duration::from_millis(hold_down),
            Duration::from_millis(time_to_learn),
        )
    }

    /// Sets the `QUIET` delay.
    pub fn with_init_delay(mut self, value: Duration) -> Self {
        self.init_delay = value;
        self
    }

    /// Sets the `SHORT_WAIT` delay.
    pub fn with_short_delay(mut self, value: Duration) -> Self {
        self.short_delay = value;
        self
    }

    /// Sets the `LONG_WAIT` delay.
    pub fn with_long_delay(mut self, value: Duration) -> Self {
        self.long_delay = value;
        self
    }

    /// Sets the hold-down period.
    pub fn with_hold_down(mut self, value: Duration) -> Self {
        self.hold_down = value;
        self
    }

    /// Sets the learn window.
    pub fn with_time_to_learn(mut self, value: Duration) -> Self {
        self.time_to_learn = value;
        self
    }

    /// Checks every duration against [`MAX_DELAY`].
    ///
    /// Returns the first offending field, in declaration order.
    pub fn validate(&self) -> Result<(), BackoffError> {
        let fields = [
            ("init_delay", self.init_delay),
            ("short_delay", self.short_delay),
            ("long_delay", self.long_delay),
            ("hold_down", self.hold_down),
            ("time_to_learn", self.time_to_learn),
        ];
        match fields.into_iter().find(|(_, value)| *value > MAX_DELAY) {
            Some((field, value)) => Err(BackoffError::InvalidConfig {
                field,
                value,
                max: MAX_DELAY,
            }),
            None => Ok(()),
        }
    }
}

//! Error types used by the backoff scheduler.
//!
//! The taxonomy is intentionally narrow: [`BackoffError::InvalidConfig`] is the only
//! user-visible failure, and it can only happen at construction time. Every
//! steady-state operation (`trigger`, timer expiry, `cancel`, `destroy`) is infallible.
//!
//! Like the rest of the runtime, the enum provides helper methods (`as_label`,
//! `as_message`) for logs and metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced while building a backoff instance.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackoffError {
    /// A configured duration is larger than the maximum representable delay.
    #[error("invalid {field}: {value:?} exceeds maximum delay {max:?}")]
    InvalidConfig {
        /// Name of the offending duration (e.g. `"long_delay"`).
        field: &'static str,
        /// The rejected value.
        value: Duration,
        /// The upper bound ([`MAX_DELAY`](crate::MAX_DELAY)).
        max: Duration,
    },
}

impl BackoffError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use spf_backoff::{BackoffError, MAX_DELAY};
    ///
    /// let err = BackoffError::InvalidConfig {
    ///     field: "hold_down",
    ///     value: Duration::MAX,
    ///     max: MAX_DELAY,
    /// };
    /// assert_eq!(err.as_label(), "backoff_invalid_config");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BackoffError::InvalidConfig { .. } => "backoff_invalid_config",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BackoffError::InvalidConfig { field, value, max } => {
                format!("{field}={}ms is above the {}ms limit", value.as_millis(), max.as_millis())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_reports_millis() {
        let err = BackoffError::InvalidConfig {
            field: "init_delay",
            value: Duration::from_millis(3_000_000_000),
            max: Duration::from_millis(1 << 31),
        };
        assert_eq!(
            err.as_message(),
            "init_delay=3000000000ms is above the 2147483648ms limit"
        );
        assert!(err.to_string().starts_with("invalid init_delay:"));
    }
}

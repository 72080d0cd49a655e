//! # Scheduler-wide configuration.
//!
//! Provides [`SchedulerConfig`], the settings shared by every instance created through a
//! [`Scheduler`](crate::Scheduler).
//!
//! Config is used in two ways:
//! 1. **Scheduler creation**: `Scheduler::new(config, subscribers)` sizes the event bus
//! 2. **Instance defaults**: `Scheduler::backoff_with_defaults(name, callback)` uses `policy`

use crate::policies::DelayPolicy;

/// Configuration for a [`Scheduler`](crate::Scheduler).
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `policy`: Delays used by instances created without an explicit policy
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Subscribers that lag behind more than `bus_capacity` events skip the oldest
    /// ones. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,

    /// Default delays for new instances.
    pub policy: DelayPolicy,
}

impl SchedulerConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SchedulerConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `policy = DelayPolicy::default()` (50 / 200 / 5000 / 10000 / 500 ms)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            policy: DelayPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_capacity_is_clamped() {
        let cfg = SchedulerConfig {
            bus_capacity: 0,
            ..SchedulerConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(SchedulerConfig::default().bus_capacity_clamped(), 1024);
    }
}

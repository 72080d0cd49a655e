//! Timing policies.
//!
//! ## Contents
//! - [`DelayPolicy`] the five durations of the IETF SPF delay algorithm
//! - [`MAX_DELAY`] upper bound accepted for any of them
//!
//! ## Quick wiring
//! ```text
//! DelayPolicy { init, short, long, hold_down, time_to_learn }
//!      └─► fsm::Machine uses:
//!           - init/short/long to arm the wait timer
//!           - hold_down to decide when the domain is stable again
//!           - time_to_learn to stop extending waits during a storm
//! ```

mod delay;

pub use delay::{DelayPolicy, MAX_DELAY};

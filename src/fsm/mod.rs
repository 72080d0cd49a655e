//! State machine of the IETF SPF delay algorithm.
//!
//! ## Contents
//! - [`State`] `QUIET` / `SHORT_WAIT` / `LONG_WAIT`
//! - [`Machine`] pure transition logic over explicit instants
//! - [`Expiry`], [`Step`] what a timer expiry or a trigger did
//!
//! Nothing here sleeps or spawns; the runtime side lives in `core`.

mod machine;
mod state;

pub use machine::{Expiry, Machine, Step};
pub use state::State;

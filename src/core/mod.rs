//! Runtime core: backoff instances and their shared scheduler.
//!
//! Internal modules:
//! - [`instance`]: one SPF delay state machine driven by a tokio timer task;
//! - [`scheduler`]: event bus, subscriber fan-out and a shared cancellation scope;
//! - [`levels`]: per-level instances of one IS-IS area;
//! - [`status`]: diagnostics snapshot with show-style output;
//! - [`config`]: scheduler-wide settings.

mod builder;
mod config;
mod instance;
mod levels;
mod scheduler;
mod status;

pub use builder::SchedulerBuilder;
pub use config::SchedulerConfig;
pub use instance::{Backoff, BackoffBuilder, TriggerHandle};
pub use levels::{Level, LevelBackoffs};
pub use scheduler::Scheduler;
pub use status::Status;

//! # Event subscribers for the backoff scheduler.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! built-in implementations for handling events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//!   Backoff ── publish(Event) ──► Bus ──► Scheduler listener ──► SubscriberSet
//!                                                                     │
//!                                                   ┌─────────────────┼──────────┐
//!                                                   ▼                 ▼          ▼
//!                                              StateTracker       LogWriter    Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;
mod tracker;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
pub use tracker::StateTracker;

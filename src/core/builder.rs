use std::sync::Arc;

use crate::{core::SchedulerConfig, subscribers::Subscribe};

use super::scheduler::Scheduler;

/// Builder for constructing a [`Scheduler`] with optional subscribers.
pub struct SchedulerBuilder {
    cfg: SchedulerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SchedulerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SchedulerConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive instance events (triggers, runs, stability, teardown)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the scheduler: event bus, subscriber workers and the bus listener.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Scheduler {
        Scheduler::new(self.cfg, self.subscribers)
    }
}

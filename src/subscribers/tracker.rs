//! # Last known state per instance, with sequence-based ordering.
//!
//! [`StateTracker`] is a subscriber that remembers the latest [`State`] reported by
//! each backoff instance. It is handy for "show" style summaries across many
//! instances without locking each of them.
//!
//! ## Rules
//! - Only events carrying both `instance` and `state` change the stored state
//! - `Destroyed` forgets the instance
//! - Events with `seq <= last_seq` are **rejected** (stale)
//! - Reads are **eventually consistent** with the instances themselves

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::events::{Event, EventKind};
use crate::fsm::State;
use crate::subscribers::Subscribe;

#[derive(Debug, Clone, Copy)]
struct Entry {
    last_seq: u64,
    state: State,
}

/// Tracks the last reported state of every live instance.
#[derive(Default)]
pub struct StateTracker {
    entries: RwLock<HashMap<String, Entry>>,
}

impl StateTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event. Returns `true` when the stored state changed.
    pub async fn update(&self, ev: &Event) -> bool {
        let Some(name) = ev.instance.as_deref() else {
            return false;
        };

        let mut entries = self.entries.write().await;
        if ev.kind == EventKind::Destroyed {
            return entries.remove(name).is_some();
        }
        let Some(state) = ev.state else {
            return false;
        };

        match entries.get_mut(name) {
            Some(entry) if ev.seq <= entry.last_seq => false,
            Some(entry) => {
                let changed = entry.state != state;
                *entry = Entry {
                    last_seq: ev.seq,
                    state,
                };
                changed
            }
            None => {
                entries.insert(
                    name.to_string(),
                    Entry {
                        last_seq: ev.seq,
                        state,
                    },
                );
                true
            }
        }
    }

    /// Returns the last known state of an instance.
    pub async fn state(&self, name: &str) -> Option<State> {
        self.entries.read().await.get(name).map(|e| e.state)
    }

    /// Returns sorted names of instances that are not `QUIET`.
    pub async fn unstable(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        let mut names: Vec<String> = entries
            .iter()
            .filter(|(_, e)| e.state != State::Quiet)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl Subscribe for StateTracker {
    async fn on_event(&self, event: &Event) {
        self.update(event).await;
    }

    fn name(&self) -> &'static str {
        "state-tracker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(kind: EventKind, name: &str, state: State) -> Event {
        Event::new(kind).with_instance(name).with_state(state)
    }

    #[tokio::test]
    async fn test_tracks_and_rejects_stale() {
        let tracker = StateTracker::new();

        let old = ev(EventKind::Triggered, "a L1", State::ShortWait);
        let new = ev(EventKind::Fired, "a L1", State::LongWait);
        assert!(tracker.update(&new).await);
        assert!(!tracker.update(&old).await);
        assert_eq!(tracker.state("a L1").await, Some(State::LongWait));

        tracker
            .update(&ev(EventKind::Stable, "a L2", State::Quiet))
            .await;
        assert_eq!(tracker.unstable().await, vec!["a L1".to_string()]);

        let gone = Event::new(EventKind::Destroyed).with_instance("a L1");
        assert!(tracker.update(&gone).await);
        assert_eq!(tracker.state("a L1").await, None);
        assert!(tracker.unstable().await.is_empty());
    }

    #[tokio::test]
    async fn test_ignores_events_without_state() {
        let tracker = StateTracker::new();
        let stale = Event::new(EventKind::StaleExpiry).with_instance("x");
        assert!(!tracker.update(&stale).await);
        assert_eq!(tracker.state("x").await, None);
    }
}

//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [triggered] instance="area1 L1" state=SHORT_WAIT delay=50ms
//! [fired] instance="area1 L1" timer=short_wait state=LONG_WAIT
//! [learned] instance="area1 L1" state=LONG_WAIT
//! [stable] instance="area1 L1"
//! [cancelled] instance="area1 L1" was=LONG_WAIT
//! [destroyed] instance="area1 L1"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let instance = e.instance.as_deref().unwrap_or("unknown");
        let state = e.state.map(|s| s.to_string()).unwrap_or_default();
        let reason = e.reason.as_deref().unwrap_or("unknown");
        let subscriber = e.subscriber.unwrap_or("unknown");

        match e.kind {
            EventKind::Triggered => match e.delay_ms {
                Some(ms) => println!("[triggered] instance={instance:?} state={state} delay={ms}ms"),
                None => println!("[triggered] instance={instance:?} state={state}"),
            },
            EventKind::Fired => {
                println!("[fired] instance={instance:?} timer={reason} state={state}");
            }
            EventKind::LearnExpired => {
                println!("[learned] instance={instance:?} state={state}");
            }
            EventKind::Stable => {
                println!("[stable] instance={instance:?}");
            }
            EventKind::StaleExpiry => {
                println!("[stale-expiry] instance={instance:?}");
            }
            EventKind::Cancelled => {
                println!("[cancelled] instance={instance:?} was={reason}");
            }
            EventKind::Destroyed => {
                println!("[destroyed] instance={instance:?}");
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] subscriber={subscriber:?} reason={reason:?}");
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] subscriber={subscriber} info={reason}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

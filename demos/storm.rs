//! # Example: Trigger Storm
//!
//! Replays a burst of topology changes against one level of an area and prints
//! every scheduler event, plus the show output at a few points in time.
//!
//! Delays are scaled down so the whole run takes a few seconds:
//! init 50ms, short 200ms, long 1s, hold-down 2s, time-to-learn 500ms.
//!
//! Run with: `cargo run --example storm --features logging`

use std::sync::Arc;
use std::time::Duration;

use spf_backoff::{
    DelayPolicy, Level, LevelBackoffs, LogWriter, RecomputeFn, RecomputeRef, Scheduler,
    SchedulerConfig, Subscribe,
};
use tokio::time::{self, Instant};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let scheduler = Scheduler::builder(SchedulerConfig::default())
        .with_subscribers(subs)
        .build();

    let t0 = Instant::now();
    let spf: RecomputeRef = RecomputeFn::arc(move |instance: &str| {
        println!(">>> SPF run for {instance} at +{}ms", t0.elapsed().as_millis());
    });

    let policy = DelayPolicy::from_millis(50, 200, 1000, 2000, 500);
    let mut area = LevelBackoffs::new("area1");
    area.configure(&scheduler, policy, spf)?;

    // A flapping link: one change every 100ms for 3s.
    let mut tick = time::interval(Duration::from_millis(100));
    while t0.elapsed() < Duration::from_secs(3) {
        tick.tick().await;
        area.trigger(Level::L1);
    }
    if let Some(l1) = area.get(Level::L1) {
        println!("{}", l1.status());
    }

    // Quiet period: back to QUIET once hold-down expires.
    time::sleep(Duration::from_millis(3500)).await;
    if let Some(l1) = area.get(Level::L1) {
        println!("{}", l1.status());
    }

    // A single change is served on the fast path again.
    area.trigger(Level::L1);
    time::sleep(Duration::from_millis(200)).await;

    area.unconfigure();
    scheduler.shutdown().await;
    Ok(())
}

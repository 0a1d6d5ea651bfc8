//! Minimal usage: two periodic tasks, console logging, graceful shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tickvisor::{ConsoleSink, Scheduler, TaskAgent, ThreadPriority};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tickvisor::register_sink(Arc::new(ConsoleSink));

    let scheduler = Scheduler::new(ThreadPriority::Normal);

    let beats = Arc::new(AtomicU64::new(0));
    let counted = beats.clone();
    let heartbeat = TaskAgent::arc("heartbeat", move || {
        let n = counted.fetch_add(1, Ordering::Relaxed) + 1;
        println!("beat #{n}");
        Ok(())
    });
    scheduler.attach(heartbeat, Duration::from_millis(500), ThreadPriority::Normal)?;

    scheduler.attach_fn(
        "sweep",
        || {
            // periodic maintenance...
            Ok(())
        },
        Duration::from_secs(2),
        ThreadPriority::BelowNormal,
    )?;

    scheduler.activate();
    std::thread::sleep(Duration::from_secs(5));
    scheduler.deactivate();

    for stats in scheduler.stats_all() {
        println!(
            "{}: scheduled={} interval cur/min/max = {:?}/{:?}/{:?}",
            stats.name,
            stats.scheduled_count,
            stats.interval_cur,
            stats.interval_min,
            stats.interval_max,
        );
    }
    Ok(())
}

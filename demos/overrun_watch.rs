//! Duration-timeout reporting: a task that sometimes overruns its period,
//! watched through the per-iteration timeout callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tickvisor::{ConsoleSink, Scheduler, ThreadPriority};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tickvisor::register_sink(Arc::new(ConsoleSink));

    let scheduler = Scheduler::new(ThreadPriority::Normal);

    let iteration = Arc::new(AtomicU64::new(0));
    scheduler.attach_fn_with_timeout(
        "bursty",
        move || {
            // Every fourth iteration blows its 100 ms budget.
            if iteration.fetch_add(1, Ordering::Relaxed) % 4 == 3 {
                std::thread::sleep(Duration::from_millis(250));
            }
            Ok(())
        },
        Duration::from_millis(100),
        ThreadPriority::Normal,
        Box::new(|timed_out| {
            if timed_out {
                eprintln!("bursty overran its budget");
            }
        }),
    )?;

    scheduler.activate();
    std::thread::sleep(Duration::from_secs(4));
    scheduler.deactivate();

    let stats = scheduler.stats("bursty").expect("bursty was registered");
    println!(
        "scheduled={} duration faults={} interval faults={}",
        stats.scheduled_count, stats.duration_fault_count, stats.interval_fault_count,
    );
    Ok(())
}

//! # tickvisor
//!
//! **Tickvisor** is a periodic task scheduler for soft real-time workloads.
//!
//! It runs each registered task on its own OS thread at a fixed cadence and
//! continuously monitors timing compliance: per-iteration duration,
//! inter-iteration interval, sticky min/max marks, and fault counts against
//! the expected bounds. The crate is designed to be embedded in long-running
//! service processes that need deterministic periodic work (sensor polling,
//! heartbeats, control loops, maintenance sweeps) without building a
//! scheduling loop per call site.
//!
//! ## Features
//!
//! | Area           | Description                                                      | Key types / traits                   |
//! |----------------|------------------------------------------------------------------|--------------------------------------|
//! | **Tasks**      | Define tasks as types or ad-hoc closures.                        | [`Task`], [`TaskRef`], [`TaskAgent`] |
//! | **Scheduling** | One worker thread per task, fixed cadence, bounded or unbounded. | [`Scheduler`], [`CyclicalWorker`]    |
//! | **Monitoring** | Duration/interval samples, min/max marks, fault counters.        | [`RoutineMonitor`], [`WorkerStats`]  |
//! | **Priorities** | Portable thread priority and scheduling-policy selectors.        | [`ThreadPriority`], [`SchedPolicy`]  |
//! | **Logging**    | Process-wide sink with a single pluggable destination.           | [`LogSink`], [`ConsoleSink`]         |
//! | **Errors**     | Typed errors for the runtime and for task executions.            | [`SchedulerError`], [`TaskError`]    |
//!
//! ## Timing model
//!
//! Workers schedule on a grid: each wakeup targets `last + period`, and an
//! iteration that overruns its period surfaces as an interval fault instead
//! of silently shifting the cadence. Duration overruns are reported back to
//! the task after every iteration via
//! [`notify_duration_timeout`](Task::notify_duration_timeout); there is no
//! hard enforcement that interrupts a running task.
//!
//! ```no_run
//! use std::time::Duration;
//! use tickvisor::{ConsoleSink, Scheduler, TaskAgent, ThreadPriority};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     tickvisor::register_sink(std::sync::Arc::new(ConsoleSink));
//!
//!     let scheduler = Scheduler::new(ThreadPriority::Normal);
//!
//!     // A task type is anything implementing `Task`; for ad-hoc work an
//!     // agent wraps a closure.
//!     let poll = TaskAgent::arc("poll-sensors", || {
//!         // read hardware, push samples...
//!         Ok(())
//!     });
//!     scheduler.attach(poll, Duration::from_millis(100), ThreadPriority::AboveNormal)?;
//!
//!     // Ad-hoc closure with an overrun callback.
//!     scheduler.attach_fn_with_timeout(
//!         "flush-metrics",
//!         || Ok(()),
//!         Duration::from_millis(500),
//!         ThreadPriority::Normal,
//!         Box::new(|timed_out| {
//!             if timed_out {
//!                 eprintln!("flush overran its period");
//!             }
//!         }),
//!     )?;
//!
//!     scheduler.activate();
//!     std::thread::sleep(Duration::from_secs(5));
//!     scheduler.deactivate();
//!     Ok(())
//! }
//! ```
//!
//! ---

mod config;
mod error;
mod monitor;
mod scheduler;
mod sink;
mod task;
mod thread;
mod worker;

// ---- Public re-exports ----

pub use config::Config;
pub use error::{SchedulerError, TaskError};
pub use monitor::RoutineMonitor;
pub use scheduler::Scheduler;
pub use sink::{clear_sink, log, register_sink, ConsoleSink, LogLevel, LogSink};
pub use task::{Task, TaskAgent, TaskRef, TimeoutCallback};
pub use thread::{
    current_thread_name, set_current_thread_name, set_current_thread_priority, SchedPolicy,
    ThreadPriority, MAX_THREAD_NAME_LEN,
};
pub use worker::{CyclicalWorker, WorkerStats};

//! # Cyclical worker: one task, one thread, one cadence.
//!
//! A [`CyclicalWorker`] pairs a task with a dedicated OS thread that invokes
//! [`run_once`](crate::Task::run_once) once per period, samples every
//! iteration through a [`RoutineMonitor`], pushes the duration-timeout status
//! back into the task, and sleeps on a condition variable until the next
//! grid point or until shutdown.
//!
//! The cadence is grid-based: the next target is always `last + period`,
//! never "now + period". An iteration that overruns its period is not
//! silently absorbed; the worker proceeds immediately and the monitor counts
//! the interval fault. Only when the worker falls behind by more than one
//! full period does the grid resync to `now`, so a long stall does not turn
//! into a burst of zero-wait iterations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::SchedulerError;
use crate::monitor::RoutineMonitor;
use crate::sink::{self, LogLevel};
use crate::task::TaskRef;
use crate::thread::{self as platform, SchedPolicy, ThreadPriority};

/// Iterations between periodic Info summaries.
const DURATION_MSG_INTERVAL: u64 = 60;

/// State shared between the worker handle and its thread.
struct Shared {
    terminated: Mutex<bool>,
    wakeup: Condvar,
    monitor: RoutineMonitor,
    scheduled_count: AtomicU64,
    execution_errors: AtomicU64,
}

impl Shared {
    fn is_terminated(&self) -> bool {
        // A poisoned flag reads as terminated so the loop winds down.
        self.terminated.lock().map(|flag| *flag).unwrap_or(true)
    }

    fn terminate(&self) {
        if let Ok(mut flag) = self.terminated.lock() {
            *flag = true;
        }
        self.wakeup.notify_all();
    }
}

/// # Point-in-time counters of one worker.
#[derive(Clone, Debug)]
pub struct WorkerStats {
    pub name: String,
    /// Whether the worker thread is still running.
    pub running: bool,
    /// Iterations started so far.
    pub scheduled_count: u64,
    /// `run_once` invocations that returned an error.
    pub execution_errors: u64,
    pub duration_cur: Duration,
    pub duration_min: Duration,
    pub duration_max: Duration,
    pub interval_cur: Duration,
    pub interval_min: Duration,
    pub interval_max: Duration,
    pub duration_fault_count: u64,
    pub interval_fault_count: u64,
}

/// # Periodic driver for a single task.
///
/// Created inactive; [`schedule_work`](CyclicalWorker::schedule_work) spawns
/// the thread. Dropping the worker terminates and joins it; drop never
/// returns while the thread is still running.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use tickvisor::{CyclicalWorker, TaskAgent, ThreadPriority};
///
/// let task = TaskAgent::arc("sweep", || Ok(()));
/// let mut worker =
///     CyclicalWorker::new(task, Duration::from_millis(100), ThreadPriority::Normal)?;
/// worker.schedule_work()?;
/// // ... later ...
/// worker.terminate();
/// worker.join();
/// # Ok::<(), tickvisor::SchedulerError>(())
/// ```
pub struct CyclicalWorker {
    task: TaskRef,
    period: Duration,
    priority: ThreadPriority,
    policy: SchedPolicy,
    /// Total lifetime cap; `Duration::ZERO` means unbounded.
    run_for: Duration,
    stack_size: Option<usize>,
    summary_every: u64,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
    started: bool,
}

impl CyclicalWorker {
    /// Creates an unbounded worker driving `task` every `period`.
    ///
    /// The monitor expects each iteration to finish inside its own period,
    /// so expected-duration and expected-interval are both `period`.
    pub fn new(
        task: TaskRef,
        period: Duration,
        priority: ThreadPriority,
    ) -> Result<Self, SchedulerError> {
        Self::build(task, period, priority, Duration::ZERO)
    }

    /// Creates a worker that terminates itself once `run_for` of wall time
    /// has passed since activation.
    pub fn bounded(
        task: TaskRef,
        priority: ThreadPriority,
        period: Duration,
        run_for: Duration,
    ) -> Result<Self, SchedulerError> {
        Self::build(task, period, priority, run_for)
    }

    fn build(
        task: TaskRef,
        period: Duration,
        priority: ThreadPriority,
        run_for: Duration,
    ) -> Result<Self, SchedulerError> {
        if period.is_zero() {
            return Err(SchedulerError::ZeroPeriod);
        }
        Ok(Self {
            shared: Arc::new(Shared {
                terminated: Mutex::new(false),
                wakeup: Condvar::new(),
                monitor: RoutineMonitor::new(period, period),
                scheduled_count: AtomicU64::new(0),
                execution_errors: AtomicU64::new(0),
            }),
            task,
            period,
            priority,
            policy: SchedPolicy::default(),
            run_for,
            stack_size: None,
            summary_every: DURATION_MSG_INTERVAL,
            handle: None,
            started: false,
        })
    }

    /// Scheduling policy for the worker thread. Takes effect on activation.
    pub fn set_policy(&mut self, policy: SchedPolicy) {
        self.policy = policy;
    }

    /// Stack size for the worker thread; `None` keeps the platform default.
    /// Takes effect on activation.
    pub fn set_stack_size(&mut self, stack_size: Option<usize>) {
        self.stack_size = stack_size;
    }

    /// Iterations between periodic Info summaries; `0` disables them.
    /// Takes effect on activation.
    pub fn set_summary_every(&mut self, summary_every: u64) {
        self.summary_every = summary_every;
    }

    /// Spawns the worker thread and starts the periodic loop. Idempotent:
    /// a second call is a no-op.
    pub fn schedule_work(&mut self) -> Result<(), SchedulerError> {
        if self.started {
            return Ok(());
        }

        let task = self.task.clone();
        let shared = self.shared.clone();
        let period = self.period;
        let run_for = self.run_for;
        let summary_every = self.summary_every;
        let priority = self.priority;
        let policy = self.policy;
        let name = self.task.name().to_string();

        let mut builder = std::thread::Builder::new().name(platform::truncate_name(&name));
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let handle = builder
            .spawn(move || {
                platform::set_current_thread_name(task.name());
                if let Err(e) = platform::set_current_thread_priority(priority, policy) {
                    sink::log(
                        LogLevel::Warning,
                        &format!(
                            "{}: could not apply priority {}: {}",
                            task.name(),
                            priority.as_label(),
                            e
                        ),
                    );
                }
                run_loop(task, &shared, period, run_for, summary_every);
            })
            .map_err(|source| SchedulerError::Spawn {
                name,
                source,
            })?;

        self.handle = Some(handle);
        self.started = true;
        Ok(())
    }

    /// Asks the worker thread to stop and wakes it from its sleep. Safe to
    /// call from any thread, any number of times.
    pub fn terminate(&self) {
        self.shared.terminate();
    }

    /// Waits for the worker thread to exit.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Name of the driven task.
    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// The configured period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether the worker thread is currently running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// Whether termination has been requested or completed.
    pub fn is_terminated(&self) -> bool {
        self.shared.is_terminated()
    }

    /// Iterations started so far.
    pub fn scheduled_count(&self) -> u64 {
        self.shared.scheduled_count.load(Ordering::Relaxed)
    }

    /// `run_once` invocations that returned an error.
    pub fn execution_errors(&self) -> u64 {
        self.shared.execution_errors.load(Ordering::Relaxed)
    }

    /// The worker's timing monitor. Accessors are safe from any thread.
    pub fn monitor(&self) -> &RoutineMonitor {
        &self.shared.monitor
    }

    /// Snapshot of the worker's counters and timing samples.
    pub fn stats(&self) -> WorkerStats {
        let m = &self.shared.monitor;
        WorkerStats {
            name: self.task.name().to_string(),
            running: self.is_running(),
            scheduled_count: self.scheduled_count(),
            execution_errors: self.execution_errors(),
            duration_cur: m.duration_cur(),
            duration_min: m.duration_min(),
            duration_max: m.duration_max(),
            interval_cur: m.interval_cur(),
            interval_min: m.interval_min(),
            interval_max: m.interval_max(),
            duration_fault_count: m.duration_fault_count(),
            interval_fault_count: m.interval_fault_count(),
        }
    }
}

impl Drop for CyclicalWorker {
    fn drop(&mut self) {
        self.terminate();
        self.join();
    }
}

/// The periodic loop, run on the worker's own thread.
fn run_loop(
    task: TaskRef,
    shared: &Shared,
    period: Duration,
    run_for: Duration,
    summary_every: u64,
) {
    let schedule_start = Instant::now();
    let mut last = schedule_start;
    let mut iterations: u64 = 0;

    loop {
        if shared.is_terminated() {
            break;
        }

        shared.monitor.start();
        shared.scheduled_count.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = task.run_once() {
            shared.execution_errors.fetch_add(1, Ordering::Relaxed);
            sink::log(
                LogLevel::Warning,
                &format!("{}: run_once failed: {}", task.name(), e),
            );
        }

        shared.monitor.stop();
        task.notify_duration_timeout(shared.monitor.is_duration_timeout());

        if !run_for.is_zero() && schedule_start.elapsed() >= run_for {
            shared.terminate();
            break;
        }

        iterations += 1;
        let wait = required_wait(&mut last, period);

        {
            let guard = match shared.terminated.lock() {
                Ok(guard) => guard,
                Err(_) => break,
            };
            if *guard {
                break;
            }
            if !wait.is_zero() {
                // wait_timeout_while re-checks the flag on spurious wakeups.
                match shared
                    .wakeup
                    .wait_timeout_while(guard, wait, |terminated| !*terminated)
                {
                    Ok((guard, _)) => {
                        if *guard {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        }

        if summary_every != 0 && iterations % summary_every == 0 {
            log_summary(task.name(), shared);
        }
    }

    log_exit(task.name(), shared);
}

/// Time until the next grid point, and the grid advance.
///
/// `last` moves by whole periods so drift surfaces as interval faults; once
/// the loop is more than one period behind, the grid resyncs to `now`.
fn required_wait(last: &mut Instant, period: Duration) -> Duration {
    let now = Instant::now();
    let target = *last + period;
    let slack = target.saturating_duration_since(now);
    *last = if now > target + period { now } else { target };
    slack
}

fn log_summary(name: &str, shared: &Shared) {
    let m = &shared.monitor;
    sink::log(
        LogLevel::Info,
        &format!(
            "{}: scheduled={} duration_us cur/min/max={}/{}/{} interval_us cur/min/max={}/{}/{} faults duration/interval={}/{}",
            name,
            shared.scheduled_count.load(Ordering::Relaxed),
            m.duration_cur().as_micros(),
            m.duration_min().as_micros(),
            m.duration_max().as_micros(),
            m.interval_cur().as_micros(),
            m.interval_min().as_micros(),
            m.interval_max().as_micros(),
            m.duration_fault_count(),
            m.interval_fault_count(),
        ),
    );
}

fn log_exit(name: &str, shared: &Shared) {
    sink::log(
        LogLevel::Info,
        &format!(
            "{}: worker exiting: scheduled={} errors={} faults duration/interval={}/{}",
            name,
            shared.scheduled_count.load(Ordering::Relaxed),
            shared.execution_errors.load(Ordering::Relaxed),
            shared.monitor.duration_fault_count(),
            shared.monitor.interval_fault_count(),
        ),
    );
}

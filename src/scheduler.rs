//! # Scheduler: worker registry and lifecycle.
//!
//! The [`Scheduler`] owns one [`CyclicalWorker`](crate::CyclicalWorker) per
//! registered task. Registration is allowed before and after
//! [`activate`](Scheduler::activate); post-activation registrations start
//! immediately. [`deactivate`](Scheduler::deactivate) signals every worker
//! and joins them; dropping the scheduler does the same, so destruction
//! never returns while a worker thread remains.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::config::Config;
use crate::error::{SchedulerError, TaskError};
use crate::sink::{self, LogLevel};
use crate::task::{Task, TaskAgent, TaskRef, TimeoutCallback};
use crate::thread::ThreadPriority;
use crate::worker::{CyclicalWorker, WorkerStats};

struct Registry {
    workers: Vec<CyclicalWorker>,
    /// Agents the scheduler created itself via the `attach_fn` forms. Kept
    /// alive at least as long as the workers referencing them.
    agents: Vec<TaskRef>,
}

/// # Registry and lifecycle manager for periodic workers.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use tickvisor::{Scheduler, ThreadPriority};
///
/// let scheduler = Scheduler::new(ThreadPriority::Normal);
/// scheduler.attach_fn(
///     "heartbeat",
///     || Ok(()),
///     Duration::from_millis(500),
///     ThreadPriority::Normal,
/// )?;
///
/// scheduler.activate();
/// // ... service lifetime ...
/// scheduler.deactivate();
/// # Ok::<(), tickvisor::SchedulerError>(())
/// ```
pub struct Scheduler {
    registry: Mutex<Registry>,
    cfg: Config,
    active: AtomicBool,
    terminated: AtomicBool,
}

impl Scheduler {
    /// Creates a scheduler whose defaults come from [`Config::default`],
    /// with `priority` as the default worker priority.
    pub fn new(priority: ThreadPriority) -> Self {
        Self::with_config(Config {
            worker_priority: priority,
            ..Config::default()
        })
    }

    /// Creates a scheduler from an explicit configuration.
    pub fn with_config(cfg: Config) -> Self {
        Self {
            registry: Mutex::new(Registry {
                workers: Vec::new(),
                agents: Vec::new(),
            }),
            cfg,
            active: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
        }
    }

    /// Registers `task` to run every `period` with an unbounded lifetime.
    pub fn attach(
        &self,
        task: TaskRef,
        period: Duration,
        priority: ThreadPriority,
    ) -> Result<(), SchedulerError> {
        self.register(task, period, priority, Duration::ZERO, None)
    }

    /// Registers `task` with a bounded lifetime: the worker terminates
    /// itself once `run_for` of wall time has passed since activation.
    pub fn attach_bounded(
        &self,
        task: TaskRef,
        priority: ThreadPriority,
        period: Duration,
        run_for: Duration,
    ) -> Result<(), SchedulerError> {
        self.register(task, period, priority, run_for, None)
    }

    /// Builds a [`TaskAgent`] from `name` and `action`, takes shared
    /// ownership of it, and registers it.
    pub fn attach_fn<A>(
        &self,
        name: impl Into<Cow<'static, str>>,
        action: A,
        period: Duration,
        priority: ThreadPriority,
    ) -> Result<(), SchedulerError>
    where
        A: FnMut() -> Result<(), TaskError> + Send + 'static,
    {
        let agent = TaskAgent::arc(name, action);
        self.register(agent.clone(), period, priority, Duration::ZERO, Some(agent))
    }

    /// Like [`attach_fn`](Scheduler::attach_fn), with a duration-timeout
    /// callback invoked after every iteration.
    pub fn attach_fn_with_timeout<A>(
        &self,
        name: impl Into<Cow<'static, str>>,
        action: A,
        period: Duration,
        priority: ThreadPriority,
        callback: TimeoutCallback,
    ) -> Result<(), SchedulerError>
    where
        A: FnMut() -> Result<(), TaskError> + Send + 'static,
    {
        let agent = TaskAgent::arc_with_timeout_callback(name, action, callback);
        self.register(agent.clone(), period, priority, Duration::ZERO, Some(agent))
    }

    fn register(
        &self,
        task: TaskRef,
        period: Duration,
        priority: ThreadPriority,
        run_for: Duration,
        agent: Option<TaskRef>,
    ) -> Result<(), SchedulerError> {
        let mut worker = if run_for.is_zero() {
            CyclicalWorker::new(task, period, priority)?
        } else {
            CyclicalWorker::bounded(task, priority, period, run_for)?
        };
        worker.set_policy(self.cfg.policy);
        worker.set_stack_size(self.cfg.stack_size_opt());
        worker.set_summary_every(self.cfg.summary_every);

        let mut registry = self.lock_registry();
        if registry.workers.len() >= self.cfg.max_workers {
            return Err(SchedulerError::WorkerLimit {
                max: self.cfg.max_workers,
            });
        }

        if self.active.load(Ordering::SeqCst) {
            if let Err(e) = worker.schedule_work() {
                sink::log(
                    LogLevel::Error,
                    &format!("{}: worker thread spawn failed: {}", worker.name(), e),
                );
                return Err(e);
            }
        }

        if let Some(agent) = agent {
            registry.agents.push(agent);
        }
        registry.workers.push(worker);
        Ok(())
    }

    /// Starts every registered worker that is not already running.
    /// Idempotent. A worker whose thread cannot be spawned is logged at
    /// Error and removed from the active set.
    pub fn activate(&self) {
        if self.active.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut registry = self.lock_registry();
        registry.workers.retain_mut(|worker| match worker.schedule_work() {
            Ok(()) => true,
            Err(e) => {
                sink::log(
                    LogLevel::Error,
                    &format!("{}: worker thread spawn failed: {}", worker.name(), e),
                );
                false
            }
        });
    }

    /// Signals every worker to terminate and joins them. Idempotent.
    ///
    /// Workers stay registered afterwards (their counters remain readable),
    /// but a deactivated scheduler cannot be reactivated: the worker threads
    /// are gone.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.terminated.store(true, Ordering::SeqCst);

        let mut registry = self.lock_registry();
        for worker in registry.workers.iter() {
            worker.terminate();
        }
        for worker in registry.workers.iter_mut().rev() {
            worker.join();
        }
    }

    /// Whether the scheduler is currently active.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// The configured default worker priority.
    pub fn worker_priority(&self) -> ThreadPriority {
        self.cfg.worker_priority
    }

    /// Number of registered workers, including self-expired bounded ones.
    pub fn worker_count(&self) -> usize {
        self.lock_registry().workers.len()
    }

    /// Snapshot of the worker driving the task named `name`.
    pub fn stats(&self, name: &str) -> Option<WorkerStats> {
        self.lock_registry()
            .workers
            .iter()
            .find(|worker| worker.name() == name)
            .map(CyclicalWorker::stats)
    }

    /// Snapshots of all registered workers, in registration order.
    pub fn stats_all(&self) -> Vec<WorkerStats> {
        self.lock_registry()
            .workers
            .iter()
            .map(CyclicalWorker::stats)
            .collect()
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        // Registration and teardown never panic while holding the lock;
        // recover the guard rather than propagate the poison.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The scheduler is itself a [`Task`], so one scheduler tier can be driven
/// inside another. Its `run_once` is a no-op tick; the scheduling work
/// happens on each worker's own thread.
impl Task for Scheduler {
    fn name(&self) -> &str {
        "scheduler"
    }

    fn run_once(&self) -> Result<(), TaskError> {
        if self.terminated.load(Ordering::SeqCst) {
            Err(TaskError::Canceled)
        } else {
            Ok(())
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.deactivate();
    }
}

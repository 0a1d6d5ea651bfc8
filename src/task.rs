//! # Task contract and closure-backed agent implementation.
//!
//! This module defines the [`Task`] trait (the unit of periodic work) and a
//! convenient closure-backed implementation [`TaskAgent`]. The common handle
//! type is [`TaskRef`], an `Arc<dyn Task>` suitable for sharing between the
//! scheduler and the worker thread driving the task.
//!
//! A task's [`run_once`](Task::run_once) is invoked once per period on the
//! worker's own thread. After every iteration the worker reports whether the
//! iteration overran via [`notify_duration_timeout`](Task::notify_duration_timeout);
//! the notification carries the current status each time, so a task wanting
//! edge detection latches it itself.

use std::{borrow::Cow, fmt, sync::Arc, sync::Mutex};

use crate::error::TaskError;

/// # Shared handle to a task object.
///
/// This is the primary type used by the scheduler and the workers.
pub type TaskRef = Arc<dyn Task>;

/// Callback invoked with the duration-timeout status of each iteration.
pub type TimeoutCallback = Box<dyn FnMut(bool) + Send + 'static>;

/// # A unit of periodic work.
///
/// A `Task` has a stable [`name`](Task::name) and a [`run_once`](Task::run_once)
/// body invoked once per scheduling period. Errors returned from `run_once`
/// are counted and logged by the worker; the cadence continues.
///
/// # Example
/// ```
/// use tickvisor::{Task, TaskError};
///
/// struct Heartbeat;
///
/// impl Task for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///
///     fn run_once(&self) -> Result<(), TaskError> {
///         // poll, publish, sweep...
///         Ok(())
///     }
/// }
///
/// assert_eq!(Heartbeat.name(), "heartbeat");
/// ```
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Executes one iteration of the task.
    fn run_once(&self) -> Result<(), TaskError>;

    /// Receives the duration-timeout status of the iteration that just
    /// finished: `true` when it overran the expected duration, `false`
    /// otherwise. Called on every iteration. Default: ignore.
    fn notify_duration_timeout(&self, timed_out: bool) {
        let _ = timed_out;
    }
}

/// # Closure-backed task implementation.
///
/// [`TaskAgent`] wraps a name, a fallible nullary action, and an optional
/// timeout callback into a [`Task`], so a host may register ad-hoc closures
/// without defining a task type. The action is protected by a [`Mutex`] to
/// allow calling `run_once(&self)` even though the closure is `FnMut`; the
/// worker is the only caller, so the lock is never contended.
///
/// Use [`TaskAgent::arc`] for a one-liner that returns a [`TaskRef`].
///
/// # Example
/// ```
/// use tickvisor::{Task, TaskAgent, TaskError, TaskRef};
///
/// let t: TaskRef = TaskAgent::arc("poller", || {
///     // do work...
///     Ok::<_, TaskError>(())
/// });
///
/// assert_eq!(t.name(), "poller");
/// assert!(t.run_once().is_ok());
/// ```
pub struct TaskAgent<A>
where
    A: FnMut() -> Result<(), TaskError> + Send + 'static,
{
    /// Stable task name.
    name: Cow<'static, str>,
    /// Underlying action (guarded by a mutex to allow `FnMut` with `&self`).
    action: Mutex<A>,
    /// Optional duration-timeout callback.
    on_timeout: Option<Mutex<TimeoutCallback>>,
}

impl<A> TaskAgent<A>
where
    A: FnMut() -> Result<(), TaskError> + Send + 'static,
{
    /// Creates a new closure-backed task without a timeout callback.
    ///
    /// Prefer [`TaskAgent::arc`] when you immediately need a [`TaskRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, action: A) -> Self {
        Self {
            name: name.into(),
            action: Mutex::new(action),
            on_timeout: None,
        }
    }

    /// Creates a closure-backed task with a duration-timeout callback.
    ///
    /// The callback is invoked after every iteration with the current
    /// timeout status.
    pub fn with_timeout_callback(
        name: impl Into<Cow<'static, str>>,
        action: A,
        callback: TimeoutCallback,
    ) -> Self {
        Self {
            name: name.into(),
            action: Mutex::new(action),
            on_timeout: Some(Mutex::new(callback)),
        }
    }

    /// Creates the agent and returns it as a shared handle (`Arc<dyn Task>`).
    pub fn arc(name: impl Into<Cow<'static, str>>, action: A) -> TaskRef {
        Arc::new(Self::new(name, action))
    }

    /// Like [`TaskAgent::arc`], with a duration-timeout callback.
    pub fn arc_with_timeout_callback(
        name: impl Into<Cow<'static, str>>,
        action: A,
        callback: TimeoutCallback,
    ) -> TaskRef {
        Arc::new(Self::with_timeout_callback(name, action, callback))
    }
}

impl<A> Task for TaskAgent<A>
where
    A: FnMut() -> Result<(), TaskError> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run_once(&self) -> Result<(), TaskError> {
        let mut action = self.action.lock().map_err(|_| TaskError::Fatal {
            reason: "action mutex poisoned".into(),
        })?;
        (action)()
    }

    fn notify_duration_timeout(&self, timed_out: bool) {
        if let Some(callback) = &self.on_timeout {
            if let Ok(mut callback) = callback.lock() {
                (callback)(timed_out);
            }
        }
    }
}

impl<A> fmt::Debug for TaskAgent<A>
where
    A: FnMut() -> Result<(), TaskError> + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskAgent")
            .field("name", &self.name)
            .field("has_timeout_callback", &self.on_timeout.is_some())
            .finish()
    }
}

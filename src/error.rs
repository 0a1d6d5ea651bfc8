//! # Error types used by the scheduler runtime and tasks.
//!
//! This module defines two main error enums:
//!
//! - [`SchedulerError`] errors raised by the scheduling runtime itself.
//! - [`TaskError`] errors raised by individual task executions.
//!
//! Both types provide an `as_label` helper for stable log labels.

use std::io;

use thiserror::Error;

/// # Errors produced by the scheduling runtime.
///
/// These represent failures of the orchestration layer, never of the task
/// bodies it drives.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Registration was refused because the configured worker limit is reached.
    #[error("worker limit {max} reached; registration refused")]
    WorkerLimit {
        /// The configured maximum number of workers.
        max: usize,
    },

    /// Registration was refused because the requested period is zero.
    #[error("scheduling period must be nonzero")]
    ZeroPeriod,

    /// The worker's OS thread could not be spawned. Fatal for that worker.
    #[error("failed to spawn worker thread '{name}': {source}")]
    Spawn {
        /// Name of the worker whose thread failed to start.
        name: String,
        /// The underlying spawn error.
        #[source]
        source: io::Error,
    },
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::WorkerLimit { .. } => "scheduler_worker_limit",
            SchedulerError::ZeroPeriod => "scheduler_zero_period",
            SchedulerError::Spawn { .. } => "scheduler_spawn_failed",
        }
    }
}

/// # Errors produced by task execution.
///
/// A failing [`run_once`](crate::Task::run_once) never stops the cadence: the
/// worker counts the failure, logs it at Warning, and schedules the next
/// iteration as usual.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Task execution failed but may succeed on a later iteration.
    #[error("execution failed: {reason}")]
    Fail { reason: String },

    /// Non-recoverable error inside the task body.
    #[error("fatal error: {reason}")]
    Fatal { reason: String },

    /// The task was asked to stop due to shutdown.
    ///
    /// This is **not an error** in the traditional sense, but signals
    /// intentional termination.
    #[error("context canceled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Indicates whether the error is fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TaskError::Fatal { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let err = SchedulerError::WorkerLimit { max: 4 };
        assert_eq!(err.as_label(), "scheduler_worker_limit");
        assert_eq!(SchedulerError::ZeroPeriod.as_label(), "scheduler_zero_period");

        let fail = TaskError::Fail {
            reason: "boom".into(),
        };
        assert_eq!(fail.as_label(), "task_failed");
        assert!(!fail.is_fatal());
        assert!(TaskError::Fatal {
            reason: "broken".into()
        }
        .is_fatal());
    }

    #[test]
    fn display_includes_context() {
        let err = SchedulerError::WorkerLimit { max: 8 };
        assert!(err.to_string().contains("8"));

        let fail = TaskError::Fail {
            reason: "sensor unreachable".into(),
        };
        assert!(fail.to_string().contains("sensor unreachable"));
    }
}

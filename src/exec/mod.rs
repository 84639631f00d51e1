// src/exec/mod.rs

//! Scheduling and process execution layer.
//!
//! - [`scheduler`] is the pure per-run state machine: staleness checks,
//!   resource-budget admission, failure propagation. No IO beyond the
//!   injected [`crate::fs::FileSystem`] view.
//! - [`runtime`] is the async shell that feeds completion events into the
//!   scheduler and dispatches admitted tasks.
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `RealExecutorBackend` used in production; tests can substitute a fake
//!   implementation.
//! - [`task_runner`] runs a single task process and verifies its declared
//!   outputs.

pub mod backend;
pub mod runtime;
pub mod scheduler;
pub mod task_runner;

use std::path::PathBuf;

use crate::graph::TaskId;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use runtime::{RunSummary, Runtime};
pub use scheduler::{NodeState, ResourceBudget, ScheduledCommand, Scheduler, SchedulerStep};

/// Why a task process counts as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    /// The process could not be started.
    Spawn(String),
    /// The process exited with a non-zero status.
    NonZeroExit(i32),
    /// The process exited zero but a declared output does not exist.
    MissingOutput(PathBuf),
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskFailure::Spawn(err) => write!(f, "failed to spawn process: {err}"),
            TaskFailure::NonZeroExit(code) => write!(f, "exited with status {code}"),
            TaskFailure::MissingOutput(path) => {
                write!(f, "declared output '{}' was not produced", path.display())
            }
        }
    }
}

/// Outcome of a task process for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(TaskFailure),
}

/// Events flowing into the runtime from the executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A task process finished with a concrete outcome.
    TaskCompleted { id: TaskId, outcome: TaskOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

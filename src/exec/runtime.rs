// src/exec/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::scheduler::{NodeState, ScheduledCommand, Scheduler, SchedulerStep};
use crate::exec::{ExecutorBackend, RuntimeEvent};

/// Aggregate result of one full run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Labels of tasks that ran and succeeded.
    pub executed: Vec<String>,
    /// Labels of tasks skipped because their outputs were up to date.
    pub skipped: Vec<String>,
    /// Failed tasks as (label, reason) pairs, in failure order.
    pub failed: Vec<(String, String)>,
    /// Labels of tasks cancelled because an upstream task failed.
    pub cancelled: Vec<String>,
    /// Whether the run stopped early on a shutdown request.
    pub interrupted: bool,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.cancelled.is_empty() && !self.interrupted
    }
}

/// Drives the scheduler in response to `RuntimeEvent`s and delegates actual
/// command execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around [`Scheduler`], which contains all the
/// scheduling semantics. This struct handles async IO: reading completion
/// events from the channel and dispatching admitted commands to the executor.
pub struct Runtime<E: ExecutorBackend> {
    scheduler: Scheduler,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        scheduler: Scheduler,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
    ) -> Self {
        Self {
            scheduler,
            event_rx,
            executor,
        }
    }

    /// Main event loop.
    ///
    /// Dispatches the initial ready set, then consumes completion events and
    /// feeds them into the scheduler until every task is terminal or a
    /// shutdown is requested.
    pub async fn run(mut self) -> Result<RunSummary> {
        info!("runtime started");

        let step = self.scheduler.start();
        let finished = step.finished;
        self.apply_step(step).await?;

        let mut interrupted = false;

        if !finished {
            loop {
                let event = match self.event_rx.recv().await {
                    Some(e) => e,
                    None => {
                        warn!("runtime event channel closed before run finished");
                        interrupted = true;
                        break;
                    }
                };

                debug!(?event, "runtime received event");

                match event {
                    RuntimeEvent::TaskCompleted { id, outcome } => {
                        let step = self.scheduler.handle_completion(id, outcome);
                        let finished = step.finished;
                        self.apply_step(step).await?;
                        if finished {
                            break;
                        }
                    }
                    RuntimeEvent::ShutdownRequested => {
                        info!("shutdown requested; stopping runtime");
                        interrupted = true;
                        break;
                    }
                }
            }
        }

        info!("runtime exiting");
        Ok(self.summarize(interrupted))
    }

    async fn apply_step(&mut self, step: SchedulerStep) -> Result<()> {
        for label in step.newly_failed.iter() {
            debug!(task = %label, "task will not complete");
        }
        self.spawn_ready(step.to_dispatch).await
    }

    async fn spawn_ready(&mut self, commands: Vec<ScheduledCommand>) -> Result<()> {
        if commands.is_empty() {
            return Ok(());
        }

        let labels: Vec<_> = commands.iter().map(|c| c.label.as_str()).collect();
        debug!(?labels, "spawning ready tasks");

        self.executor.spawn_ready_tasks(commands).await
    }

    fn summarize(&self, interrupted: bool) -> RunSummary {
        RunSummary {
            executed: self.scheduler.labels_in_state(NodeState::Succeeded),
            skipped: self.scheduler.labels_in_state(NodeState::Skipped),
            failed: self
                .scheduler
                .failures()
                .map(|(node, reason)| (node.label(), reason.to_string()))
                .collect(),
            cancelled: self.scheduler.labels_in_state(NodeState::Cancelled),
            interrupted,
        }
    }
}

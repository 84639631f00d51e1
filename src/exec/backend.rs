// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender, so
//! tests can substitute an implementation that emits `TaskCompleted` events
//! without spawning real processes.
//!
//! - `RealExecutorBackend` forwards admitted commands over an mpsc channel to
//!   a background executor loop, which runs each command in its own Tokio
//!   task via [`super::task_runner`].

use std::future::Future;
use std::pin::Pin;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::scheduler::ScheduledCommand;
use crate::exec::task_runner::run_task;
use crate::exec::RuntimeEvent;

/// Trait abstracting how admitted commands are executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given commands for execution.
    ///
    /// The implementation is free to:
    /// - spawn OS processes (production)
    /// - simulate completion and emit `RuntimeEvent`s (tests)
    fn spawn_ready_tasks(
        &mut self,
        commands: Vec<ScheduledCommand>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ScheduledCommand>,
}

impl RealExecutorBackend {
    /// Create a new real executor backend wired to the given runtime event
    /// sender. This spawns the background executor loop immediately.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let tx = spawn_executor(runtime_tx);
        Self { tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        commands: Vec<ScheduledCommand>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for command in commands {
                tx.send(command)
                    .await
                    .context("executor loop is no longer running")?;
            }
            Ok(())
        })
    }
}

/// Spawn the background executor loop.
///
/// Each received command runs in its own Tokio task. The scheduler admits
/// every task at most once per run, so the loop needs no per-task dedup.
fn spawn_executor(runtime_tx: mpsc::Sender<RuntimeEvent>) -> mpsc::Sender<ScheduledCommand> {
    let (tx, mut rx) = mpsc::channel::<ScheduledCommand>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        while let Some(command) = rx.recv().await {
            let rt_tx = runtime_tx.clone();
            let label = command.label.clone();
            tokio::spawn(async move {
                run_task(command, rt_tx).await;
                debug!(task = %label, "task runner future finished");
            });
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}

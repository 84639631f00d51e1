// src/exec/task_runner.rs

//! Individual task process runner.

use std::fs::OpenOptions;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::exec::scheduler::ScheduledCommand;
use crate::exec::{RuntimeEvent, TaskFailure, TaskOutcome};

/// Run a single task process to completion and emit a `TaskCompleted` event.
///
/// Stdout and stderr both go to the task's log file, appended so repeated
/// attempts accumulate in one place. A zero exit status only counts as
/// success when every declared output exists afterwards.
pub async fn run_task(command: ScheduledCommand, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    let id = command.id;
    let label = command.label.clone();

    let outcome = match run_task_inner(command).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(task = %label, error = %err, "task execution error");
            TaskOutcome::Failed(TaskFailure::Spawn(err.to_string()))
        }
    };

    let _ = runtime_tx
        .send(RuntimeEvent::TaskCompleted { id, outcome })
        .await;
}

async fn run_task_inner(command: ScheduledCommand) -> Result<TaskOutcome> {
    info!(
        task = %command.label,
        cmd = %command.cmd,
        log = %command.log.display(),
        "starting task process"
    );

    for output in command.outputs.iter() {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory '{}'", parent.display()))?;
        }
    }
    if let Some(parent) = command.log.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory '{}'", parent.display()))?;
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&command.log)
        .with_context(|| format!("opening log file '{}'", command.log.display()))?;
    let log_for_stderr = log_file
        .try_clone()
        .with_context(|| format!("cloning log handle for '{}'", command.log.display()))?;

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&command.cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&command.cmd);
        c
    };

    cmd.stdout(Stdio::from(log_file))
        .stderr(Stdio::from(log_for_stderr))
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            return Ok(TaskOutcome::Failed(TaskFailure::Spawn(err.to_string())));
        }
    };

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of task '{}'", command.label))?;

    if !status.success() {
        let code = status.code().unwrap_or(-1);
        info!(task = %command.label, exit_code = code, "task process failed");
        return Ok(TaskOutcome::Failed(TaskFailure::NonZeroExit(code)));
    }

    for output in command.outputs.iter() {
        if !output.exists() {
            return Ok(TaskOutcome::Failed(TaskFailure::MissingOutput(
                output.clone(),
            )));
        }
    }

    info!(task = %command.label, "task process exited successfully");
    Ok(TaskOutcome::Success)
}

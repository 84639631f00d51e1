// tests/task_runner_process.rs

//! Real process execution through the task runner.

#![cfg(unix)]

use std::sync::Arc;

use tokio::sync::mpsc;

use seqflow::exec::task_runner::run_task;
use seqflow::exec::{RuntimeEvent, ScheduledCommand, TaskFailure, TaskOutcome};
use seqflow::graph::Resources;
use seqflow_test_utils::{init_tracing, with_timeout};

fn command(dir: &std::path::Path, cmd: &str, outputs: &[&str]) -> ScheduledCommand {
    ScheduledCommand {
        id: 0,
        label: "probe".to_string(),
        cmd: cmd.to_string(),
        log: dir.join("logs/probe.log"),
        outputs: outputs.iter().map(|o| dir.join(o)).collect(),
        resources: Resources {
            memory_mb: 64,
            threads: 1,
        },
    }
}

async fn outcome_of(command: ScheduledCommand) -> TaskOutcome {
    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(4);
    run_task(command, tx).await;
    match rx.recv().await {
        Some(RuntimeEvent::TaskCompleted { outcome, .. }) => outcome,
        other => panic!("expected TaskCompleted, got {other:?}"),
    }
}

#[tokio::test]
async fn successful_processes_verify_their_outputs() {
    init_tracing();
    with_timeout(async {
        let dir = tempfile::tempdir().unwrap();
        let cmd = command(
            dir.path(),
            &format!("echo done > {}", dir.path().join("result.txt").display()),
            &["result.txt"],
        );

        assert_eq!(outcome_of(cmd).await, TaskOutcome::Success);
        assert!(dir.path().join("result.txt").exists());

        let log = std::fs::read_to_string(dir.path().join("logs/probe.log")).unwrap();
        assert!(log.is_empty(), "stdout went to the output file, not the log");
    })
    .await;
}

#[tokio::test]
async fn stdout_and_stderr_are_captured_in_the_log() {
    init_tracing();
    with_timeout(async {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("result.txt");
        let cmd = command(
            dir.path(),
            &format!("echo to-stdout; echo to-stderr >&2; touch {}", out.display()),
            &["result.txt"],
        );

        assert_eq!(outcome_of(cmd).await, TaskOutcome::Success);

        let log = std::fs::read_to_string(dir.path().join("logs/probe.log")).unwrap();
        assert!(log.contains("to-stdout"));
        assert!(log.contains("to-stderr"));
    })
    .await;
}

#[tokio::test]
async fn non_zero_exits_are_reported_with_the_status() {
    init_tracing();
    with_timeout(async {
        let dir = tempfile::tempdir().unwrap();
        let cmd = command(dir.path(), "exit 3", &[]);

        assert_eq!(
            outcome_of(cmd).await,
            TaskOutcome::Failed(TaskFailure::NonZeroExit(3))
        );
    })
    .await;
}

#[tokio::test]
async fn a_zero_exit_without_the_declared_output_is_a_failure() {
    init_tracing();
    with_timeout(async {
        let dir = tempfile::tempdir().unwrap();
        let cmd = command(dir.path(), "true", &["never_written.txt"]);

        match outcome_of(cmd).await {
            TaskOutcome::Failed(TaskFailure::MissingOutput(path)) => {
                assert!(path.ends_with("never_written.txt"));
            }
            other => panic!("expected MissingOutput, got {other:?}"),
        }
    })
    .await;
}

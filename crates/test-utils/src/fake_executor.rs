use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use seqflow::errors::Result;
use seqflow::exec::{
    ExecutorBackend, RuntimeEvent, ScheduledCommand, TaskFailure, TaskOutcome,
};

/// A fake executor that:
/// - records the labels of tasks that were "run"
/// - immediately reports `TaskCompleted` for each scheduled command, failing
///   the labels named in `fail` and succeeding everything else.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    fail: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            fail: HashSet::new(),
        }
    }

    /// Make the given task labels report a non-zero exit.
    pub fn failing(mut self, labels: &[&str]) -> Self {
        self.fail = labels.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        commands: Vec<ScheduledCommand>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let fail = self.fail.clone();

        Box::pin(async move {
            for command in commands {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(command.label.clone());
                }

                let outcome = if fail.contains(&command.label) {
                    TaskOutcome::Failed(TaskFailure::NonZeroExit(1))
                } else {
                    TaskOutcome::Success
                };

                tx.send(RuntimeEvent::TaskCompleted {
                    id: command.id,
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}

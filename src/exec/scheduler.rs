// src/exec/scheduler.rs

//! Per-run state machine over the pruned task graph.
//!
//! The scheduler never mutates graph topology, only per-node state. It is
//! synchronous and deterministic; the async shell in [`super::runtime`]
//! drives it with completion events.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::errors::PipelineError;
use crate::fs::FileSystem;
use crate::graph::{Resources, TaskGraph, TaskId, TaskNode};

use super::TaskOutcome;

/// Per-run state of one task node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Waiting on unfinished upstream tasks.
    Pending,
    /// All upstream tasks succeeded or were skipped; stale; awaiting budget.
    Ready,
    /// Dispatched to the executor.
    Running,
    /// All outputs exist and none is older than any input.
    Skipped,
    Succeeded,
    Failed,
    /// Terminal state of the downstream closure of a failed task.
    Cancelled,
}

impl NodeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeState::Skipped | NodeState::Succeeded | NodeState::Failed | NodeState::Cancelled
        )
    }
}

/// Global resource budget shared by all running tasks.
#[derive(Debug, Clone, Copy)]
pub struct ResourceBudget {
    pub memory_mb: u64,
    pub threads: u32,
}

/// Description of a task the scheduler wants the executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledCommand {
    pub id: TaskId,
    pub label: String,
    pub cmd: String,
    pub log: PathBuf,
    pub outputs: Vec<PathBuf>,
    pub resources: Resources,
}

impl ScheduledCommand {
    fn from_node(node: &TaskNode) -> Self {
        Self {
            id: node.id,
            label: node.label(),
            cmd: node.cmd.clone(),
            log: node.log.clone(),
            outputs: node.outputs.clone(),
            resources: node.resources,
        }
    }
}

/// Structured result of a single scheduler step.
#[derive(Debug, Clone)]
pub struct SchedulerStep {
    /// Tasks admitted for execution in this step.
    pub to_dispatch: Vec<ScheduledCommand>,
    /// Labels of tasks newly failed or cancelled in this step.
    pub newly_failed: Vec<String>,
    /// Whether every task in the run is now terminal.
    pub finished: bool,
}

/// Scheduler over the pruned view of an immutable [`TaskGraph`].
#[derive(Debug)]
pub struct Scheduler {
    graph: Arc<TaskGraph>,
    fs: Arc<dyn FileSystem>,
    /// Nodes participating in this run, in stable order.
    in_run: Vec<TaskId>,
    states: HashMap<TaskId, NodeState>,
    budget: ResourceBudget,
    reserved_memory_mb: u64,
    reserved_threads: u32,
    /// Failure reasons by task, in failure order.
    failures: Vec<(TaskId, String)>,
}

impl Scheduler {
    pub fn new(
        graph: Arc<TaskGraph>,
        pruned: Vec<TaskId>,
        budget: ResourceBudget,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let states = pruned.iter().map(|&id| (id, NodeState::Pending)).collect();
        Self {
            graph,
            fs,
            in_run: pruned,
            states,
            budget,
            reserved_memory_mb: 0,
            reserved_threads: 0,
            failures: Vec::new(),
        }
    }

    pub fn state_of(&self, id: TaskId) -> Option<NodeState> {
        self.states.get(&id).copied()
    }

    pub fn is_finished(&self) -> bool {
        self.states.values().all(|s| s.is_terminal())
    }

    pub fn any_failed(&self) -> bool {
        self.states
            .values()
            .any(|s| matches!(s, NodeState::Failed | NodeState::Cancelled))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&TaskNode, &str)> {
        self.failures
            .iter()
            .map(|(id, reason)| (self.graph.node(*id), reason.as_str()))
    }

    /// Labels of in-run tasks currently in the given state.
    pub fn labels_in_state(&self, state: NodeState) -> Vec<String> {
        self.in_run
            .iter()
            .filter(|id| self.states.get(id) == Some(&state))
            .map(|&id| self.graph.node(id).label())
            .collect()
    }

    /// Initial step: evaluate staleness for dependency-free tasks and admit
    /// what fits in the budget.
    pub fn start(&mut self) -> SchedulerStep {
        info!(
            tasks = self.in_run.len(),
            memory_mb = self.budget.memory_mb,
            threads = self.budget.threads,
            "starting run"
        );
        let newly_failed = self.promote_ready();
        let to_dispatch = self.admit();
        SchedulerStep {
            to_dispatch,
            newly_failed,
            finished: self.is_finished(),
        }
    }

    /// Handle completion of a running task.
    pub fn handle_completion(&mut self, id: TaskId, outcome: TaskOutcome) -> SchedulerStep {
        let node = self.graph.node(id);

        match self.states.get(&id) {
            Some(NodeState::Running) => {}
            other => {
                warn!(task = %node.label(), state = ?other, "completion for task that is not running; ignoring");
                return SchedulerStep {
                    to_dispatch: Vec::new(),
                    newly_failed: Vec::new(),
                    finished: self.is_finished(),
                };
            }
        }

        // Release the reservation regardless of outcome.
        self.reserved_memory_mb -= node.resources.memory_mb;
        self.reserved_threads -= node.resources.threads;

        let mut newly_failed = Vec::new();

        match outcome {
            TaskOutcome::Success => {
                debug!(task = %node.label(), "task completed successfully");
                self.states.insert(id, NodeState::Succeeded);
            }
            TaskOutcome::Failed(failure) => {
                warn!(task = %node.label(), error = %failure, "task failed; cancelling downstream tasks");
                self.states.insert(id, NodeState::Failed);
                self.failures.push((id, failure.to_string()));
                newly_failed.push(node.label());
                newly_failed.extend(self.cancel_downstream(id));
            }
        }

        newly_failed.extend(self.promote_ready());
        let to_dispatch = self.admit();

        SchedulerStep {
            to_dispatch,
            newly_failed,
            finished: self.is_finished(),
        }
    }

    /// Move every `Pending` task whose upstream is settled to `Ready`,
    /// `Skipped`, or `Failed` (missing leaf input). Skipping can unblock
    /// further tasks, so this loops to a fixpoint.
    fn promote_ready(&mut self) -> Vec<String> {
        let mut newly_failed = Vec::new();

        loop {
            let mut changed = false;

            for &id in self.in_run.clone().iter() {
                if self.states.get(&id) != Some(&NodeState::Pending) {
                    continue;
                }
                let node = self.graph.node(id);
                if !self.deps_settled(node) {
                    continue;
                }

                if !self.is_stale(node) {
                    debug!(task = %node.label(), "outputs up to date; skipping");
                    self.states.insert(id, NodeState::Skipped);
                    changed = true;
                    continue;
                }

                if let Some(missing) = self.missing_leaf_input(node) {
                    let err = PipelineError::MissingInputError {
                        task: node.label(),
                        path: missing.display().to_string(),
                    };
                    warn!(task = %node.label(), error = %err, "cannot run task");
                    self.states.insert(id, NodeState::Failed);
                    self.failures.push((id, err.to_string()));
                    newly_failed.push(node.label());
                    newly_failed.extend(self.cancel_downstream(id));
                    changed = true;
                    continue;
                }

                // A reservation larger than the whole budget can never be
                // admitted, so the task fails now instead of waiting forever.
                if node.resources.memory_mb > self.budget.memory_mb
                    || node.resources.threads > self.budget.threads
                {
                    let err = PipelineError::ConfigError(format!(
                        "task '{}' reserves {} MB / {} thread(s), more than the total budget of {} MB / {} thread(s)",
                        node.label(),
                        node.resources.memory_mb,
                        node.resources.threads,
                        self.budget.memory_mb,
                        self.budget.threads
                    ));
                    warn!(task = %node.label(), error = %err, "task can never fit the budget");
                    self.states.insert(id, NodeState::Failed);
                    self.failures.push((id, err.to_string()));
                    newly_failed.push(node.label());
                    newly_failed.extend(self.cancel_downstream(id));
                    changed = true;
                    continue;
                }

                debug!(task = %node.label(), "dependencies satisfied; task is ready");
                self.states.insert(id, NodeState::Ready);
                changed = true;
            }

            if !changed {
                break;
            }
        }

        newly_failed
    }

    /// Whether every upstream task has reached `Succeeded` or `Skipped`.
    fn deps_settled(&self, node: &TaskNode) -> bool {
        node.deps.iter().all(|dep| {
            matches!(
                self.states.get(dep),
                Some(NodeState::Succeeded) | Some(NodeState::Skipped) | None
            )
        })
    }

    /// A task is stale if any declared output is missing, or any output is
    /// older than any input.
    fn is_stale(&self, node: &TaskNode) -> bool {
        let mut oldest_output: Option<SystemTime> = None;
        for output in node.outputs.iter() {
            if !self.fs.exists(output) {
                return true;
            }
            match self.fs.mtime(output) {
                Ok(mtime) => {
                    oldest_output =
                        Some(oldest_output.map_or(mtime, |current| current.min(mtime)));
                }
                Err(_) => return true,
            }
        }

        let Some(oldest_output) = oldest_output else {
            // No declared outputs; nothing to be stale against.
            return false;
        };

        for input in node.inputs.iter() {
            match self.fs.mtime(input) {
                Ok(input_mtime) if input_mtime > oldest_output => return true,
                Ok(_) => {}
                // Missing input with fresh outputs: the task must run, and
                // the leaf-input check decides whether it can.
                Err(_) => return true,
            }
        }

        false
    }

    /// First leaf input (no producer in the graph) absent from disk, if any.
    fn missing_leaf_input<'a>(&self, node: &'a TaskNode) -> Option<&'a PathBuf> {
        node.inputs
            .iter()
            .find(|input| self.graph.producer_of(input).is_none() && !self.fs.exists(input))
    }

    /// Cancel the in-run downstream closure of a failed task. Returns the
    /// labels of newly cancelled tasks.
    fn cancel_downstream(&mut self, id: TaskId) -> Vec<String> {
        let mut cancelled = Vec::new();

        for downstream in self.graph.downstream_of(id) {
            match self.states.get(&downstream) {
                Some(state) if !state.is_terminal() => {
                    debug!(
                        task = %self.graph.node(downstream).label(),
                        "cancelled due to upstream failure"
                    );
                    self.states.insert(downstream, NodeState::Cancelled);
                    cancelled.push(self.graph.node(downstream).label());
                }
                _ => {}
            }
        }

        cancelled
    }

    /// Admit ready tasks under the global budget.
    ///
    /// Greedy policy: tasks unblocking the most pending downstream work go
    /// first, with larger reservations winning ties so big tasks are not
    /// starved by fragmentation.
    fn admit(&mut self) -> Vec<ScheduledCommand> {
        let mut candidates: Vec<TaskId> = self
            .in_run
            .iter()
            .copied()
            .filter(|id| self.states.get(id) == Some(&NodeState::Ready))
            .collect();

        candidates.sort_by_key(|&id| {
            let node = self.graph.node(id);
            (
                std::cmp::Reverse(self.pending_downstream_count(id)),
                std::cmp::Reverse(node.resources.memory_mb),
                std::cmp::Reverse(node.resources.threads),
                id,
            )
        });

        let mut admitted = Vec::new();
        for id in candidates {
            let node = self.graph.node(id);
            let fits = self.reserved_memory_mb + node.resources.memory_mb
                <= self.budget.memory_mb
                && self.reserved_threads + node.resources.threads <= self.budget.threads;
            if !fits {
                continue;
            }

            self.reserved_memory_mb += node.resources.memory_mb;
            self.reserved_threads += node.resources.threads;
            self.states.insert(id, NodeState::Running);
            info!(
                task = %node.label(),
                memory_mb = node.resources.memory_mb,
                threads = node.resources.threads,
                "admitting task"
            );
            admitted.push(ScheduledCommand::from_node(node));
        }

        admitted
    }

    /// Number of in-run downstream tasks still pending behind this one.
    fn pending_downstream_count(&self, id: TaskId) -> usize {
        self.graph
            .downstream_of(id)
            .into_iter()
            .filter(|d| self.states.get(d) == Some(&NodeState::Pending))
            .count()
    }
}

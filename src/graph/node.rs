// src/graph/node.rs

//! Concrete task nodes produced by the graph builder.

use std::path::PathBuf;

use crate::graph::template::Resources;

/// Index of a task node within its [`crate::graph::TaskGraph`].
pub type TaskId = usize;

/// One fully path-bound instance of a rule template.
///
/// Topology (`deps` / `dependents`) is immutable after the builder finishes;
/// per-run state lives in the scheduler, not here.
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub id: TaskId,
    pub rule: String,
    pub sample: Option<String>,
    pub analysis: Option<String>,
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    pub cmd: String,
    pub log: PathBuf,
    pub resources: Resources,
    /// Direct upstream tasks (producers of this task's inputs).
    pub deps: Vec<TaskId>,
    /// Direct downstream tasks.
    pub dependents: Vec<TaskId>,
}

impl TaskNode {
    /// Human-readable instance name, e.g. `star_map[sampleA]`.
    pub fn label(&self) -> String {
        match (&self.sample, &self.analysis) {
            (Some(sample), _) => format!("{}[{}]", self.rule, sample),
            (_, Some(analysis)) => format!("{}[{}]", self.rule, analysis),
            _ => self.rule.clone(),
        }
    }
}

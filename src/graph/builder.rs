// src/graph/builder.rs

//! Expansion of the rule catalog into the concrete task graph.
//!
//! Each template is cross-producted with its axis (samples, analyses, or a
//! single instance), placeholders are bound to literal paths, and edges are
//! wired by output-path equality: task B depends on task A exactly when one
//! of B's inputs is one of A's outputs. Inputs no task produces are external
//! leaf inputs, checked on disk at execution time.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::analysis::AnalysisSpec;
use crate::errors::{PipelineError, Result};
use crate::graph::catalog::Layout;
use crate::graph::node::{TaskId, TaskNode};
use crate::graph::template::{bind, Axis, InputSpec, RuleTemplate, SampleFilter};
use crate::samples::{ReadLayout, SampleRecord, SampleRegistry};

/// The full immutable task graph for one invocation.
#[derive(Debug)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
    producer_of: HashMap<PathBuf, TaskId>,
}

impl TaskGraph {
    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    pub fn node(&self, id: TaskId) -> &TaskNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Task producing the given output path, if any. `None` means the path
    /// is an external leaf input (or simply unknown).
    pub fn producer_of(&self, path: &Path) -> Option<TaskId> {
        self.producer_of.get(path).copied()
    }

    /// IDs of all direct and transitive dependents of `id`.
    pub fn downstream_of(&self, id: TaskId) -> Vec<TaskId> {
        let mut stack: Vec<TaskId> = self.nodes[id].dependents.clone();
        let mut seen = vec![false; self.nodes.len()];
        let mut closure = Vec::new();

        while let Some(next) = stack.pop() {
            if seen[next] {
                continue;
            }
            seen[next] = true;
            closure.push(next);
            stack.extend(self.nodes[next].dependents.iter().copied());
        }

        closure
    }
}

/// Expand the catalog into a [`TaskGraph`].
pub fn build_graph(
    catalog: &[RuleTemplate],
    layout: &Layout,
    samples: &SampleRegistry,
    analyses: &[AnalysisSpec],
) -> Result<TaskGraph> {
    let mut nodes: Vec<TaskNode> = Vec::new();

    for template in catalog {
        match template.axis {
            Axis::Singleton => {
                let node = instantiate(template, layout, None, None, nodes.len())?;
                nodes.push(node);
            }
            Axis::PerSample => {
                for record in samples.iter() {
                    if !filter_matches(template.filter, record.layout()) {
                        continue;
                    }
                    let node = instantiate(template, layout, Some(record), None, nodes.len())?;
                    nodes.push(node);
                }
            }
            Axis::PerAnalysis => {
                for analysis in analyses {
                    let node =
                        instantiate(template, layout, None, Some(analysis), nodes.len())?;
                    nodes.push(node);
                }
            }
        }
    }

    let producer_of = index_producers(&nodes)?;
    wire_edges(&mut nodes, &producer_of);
    check_acyclic(&nodes)?;

    debug!(tasks = nodes.len(), "task graph built");

    Ok(TaskGraph { nodes, producer_of })
}

fn filter_matches(filter: SampleFilter, layout: ReadLayout) -> bool {
    match filter {
        SampleFilter::Any => true,
        SampleFilter::PairedOnly => layout == ReadLayout::Paired,
        SampleFilter::SingleOnly => layout == ReadLayout::Single,
    }
}

fn instantiate(
    template: &RuleTemplate,
    layout: &Layout,
    sample: Option<&SampleRecord>,
    analysis: Option<&AnalysisSpec>,
    id: TaskId,
) -> Result<TaskNode> {
    let mut vars: BTreeMap<&str, String> = BTreeMap::new();
    if let Some(record) = sample {
        vars.insert("sample", record.name.clone());
    }
    if let Some(spec) = analysis {
        vars.insert("analysis", spec.name.clone());
        vars.insert("case", spec.case_sample_groups.clone());
        vars.insert("control", spec.control_sample_groups.clone());
        vars.insert("covariates", spec.covariates.clone());
        // Quotes would break the single-quoted shell argument.
        vars.insert(
            "description",
            spec.description.replace(['\'', '"'], "."),
        );
        vars.insert("self_contained", spec.self_contained.to_string());
    }

    let rule = template.name.as_str();

    let mut inputs: Vec<PathBuf> = Vec::new();
    for spec in template.inputs.iter() {
        match spec {
            InputSpec::Path(pattern) => {
                inputs.push(PathBuf::from(bind(rule, pattern, &vars)?));
            }
            InputSpec::RawReads => {
                let record = sample.ok_or_else(|| {
                    PipelineError::ConfigError(format!(
                        "rule '{rule}' declares raw reads but has no sample axis"
                    ))
                })?;
                for file in record.reads_files() {
                    inputs.push(layout.reads_dir.join(file));
                }
            }
            InputSpec::TrimmedReads => {
                let record = sample.ok_or_else(|| {
                    PipelineError::ConfigError(format!(
                        "rule '{rule}' declares trimmed reads but has no sample axis"
                    ))
                })?;
                match record.layout() {
                    ReadLayout::Paired => {
                        inputs.push(PathBuf::from(layout.trimmed_r1(&record.name)));
                        inputs.push(PathBuf::from(layout.trimmed_r2(&record.name)));
                    }
                    ReadLayout::Single => {
                        inputs.push(PathBuf::from(layout.trimmed_single(&record.name)));
                    }
                }
            }
        }
    }

    let mut outputs: Vec<PathBuf> = Vec::new();
    for pattern in template.outputs.iter() {
        outputs.push(PathBuf::from(bind(rule, pattern, &vars)?));
    }

    let log = PathBuf::from(bind(rule, &template.log, &vars)?);

    // The command additionally sees the resolved file lists.
    let input_keys: Vec<String> = (0..inputs.len()).map(|i| format!("input{i}")).collect();
    let output_keys: Vec<String> = (0..outputs.len()).map(|i| format!("output{i}")).collect();
    let mut cmd_vars = vars.clone();
    cmd_vars.insert("log", log.display().to_string());
    let joined = inputs
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" ");
    cmd_vars.insert("input", joined);
    for (i, key) in input_keys.iter().enumerate() {
        cmd_vars.insert(key.as_str(), inputs[i].display().to_string());
    }
    let joined = outputs
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" ");
    cmd_vars.insert("output", joined);
    for (i, key) in output_keys.iter().enumerate() {
        cmd_vars.insert(key.as_str(), outputs[i].display().to_string());
    }

    let pattern = match (sample.map(|r| r.layout()), &template.cmd_single) {
        (Some(ReadLayout::Single), Some(single)) => single.as_str(),
        _ => template.cmd.as_str(),
    };
    let cmd = bind(rule, pattern, &cmd_vars)?;

    Ok(TaskNode {
        id,
        rule: template.name.clone(),
        sample: sample.map(|r| r.name.clone()),
        analysis: analysis.map(|a| a.name.clone()),
        inputs,
        outputs,
        cmd,
        log,
        resources: template.resources,
        deps: Vec::new(),
        dependents: Vec::new(),
    })
}

/// Global index from output path to producing task. Every output path may be
/// produced by at most one task in the whole graph.
fn index_producers(nodes: &[TaskNode]) -> Result<HashMap<PathBuf, TaskId>> {
    let mut producer_of: HashMap<PathBuf, TaskId> = HashMap::new();

    for node in nodes {
        for output in node.outputs.iter() {
            if let Some(&existing) = producer_of.get(output) {
                return Err(PipelineError::GraphConflictError {
                    path: output.display().to_string(),
                    first: nodes[existing].label(),
                    second: node.label(),
                });
            }
            producer_of.insert(output.clone(), node.id);
        }
    }

    Ok(producer_of)
}

fn wire_edges(nodes: &mut [TaskNode], producer_of: &HashMap<PathBuf, TaskId>) {
    let mut edges: Vec<(TaskId, TaskId)> = Vec::new();

    for node in nodes.iter() {
        let mut deps: Vec<TaskId> = node
            .inputs
            .iter()
            .filter_map(|input| producer_of.get(input).copied())
            .collect();
        deps.sort_unstable();
        deps.dedup();
        for dep in deps {
            edges.push((dep, node.id));
        }
    }

    for (from, to) in edges {
        nodes[to].deps.push(from);
        nodes[from].dependents.push(to);
    }
}

fn check_acyclic(nodes: &[TaskNode]) -> Result<()> {
    let mut graph: DiGraphMap<TaskId, ()> = DiGraphMap::new();

    for node in nodes {
        graph.add_node(node.id);
        for &dep in node.deps.iter() {
            graph.add_edge(dep, node.id, ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let id = cycle.node_id();
            Err(PipelineError::CycleError(nodes[id].label()))
        }
    }
}

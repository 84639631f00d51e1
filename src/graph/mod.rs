// src/graph/mod.rs

//! Task-graph construction and target resolution.
//!
//! - [`template`] defines rule templates and placeholder binding.
//! - [`catalog`] expands the fixed rule set for one branch selection.
//! - [`builder`] instantiates templates into concrete task nodes and wires
//!   dependency edges by output-path equality.
//! - [`node`] holds the concrete task node type.
//! - [`targets`] maps target-group names to required files and prunes the
//!   graph accordingly.

pub mod builder;
pub mod catalog;
pub mod node;
pub mod targets;
pub mod template;

pub use builder::{build_graph, TaskGraph};
pub use catalog::{build_catalog, logo_path, Layout};
pub use node::{TaskId, TaskNode};
pub use targets::{prune, required_files, TargetCatalog, TargetGroup, DEFAULT_TARGET, HELP_TARGET};
pub use template::{Axis, InputSpec, Resources, RuleTemplate, SampleFilter};

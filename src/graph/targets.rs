// src/graph/targets.rs

//! Target groups and target resolution.
//!
//! The catalog is built once from the layout and branch selection and read
//! only afterwards. Resolution flattens the requested groups into a single
//! deduplicated file list (idempotent), appends the fixed annotations
//! archive, and prunes the graph to the producers of that list.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::debug;

use crate::analysis::AnalysisSpec;
use crate::branch::{BranchSelection, QuantLevel};
use crate::errors::{PipelineError, Result};
use crate::graph::builder::TaskGraph;
use crate::graph::catalog::Layout;
use crate::graph::node::TaskId;
use crate::samples::SampleRegistry;

/// Name of the group built when the user requests nothing.
pub const DEFAULT_TARGET: &str = "final-report";

/// Pseudo-target that lists all groups and produces no files of its own.
pub const HELP_TARGET: &str = "help";

/// A named, user-selectable bundle of required output files.
#[derive(Debug, Clone)]
pub struct TargetGroup {
    pub name: String,
    pub description: String,
    pub files: Vec<PathBuf>,
}

/// Ordered, immutable catalog of all target groups for one branch selection.
#[derive(Debug)]
pub struct TargetCatalog {
    groups: Vec<TargetGroup>,
}

impl TargetCatalog {
    pub fn build(
        layout: &Layout,
        branches: &BranchSelection,
        samples: &SampleRegistry,
        analyses: &[AnalysisSpec],
    ) -> Self {
        let mapper = layout.mapper().as_str();

        let coverage_files: Vec<PathBuf> = samples
            .names()
            .flat_map(|name| layout.coverage_files(name))
            .map(PathBuf::from)
            .collect();

        let mut salmon_counts_files: Vec<PathBuf> = Vec::new();
        for level in branches.quant.iter().copied() {
            salmon_counts_files.push(PathBuf::from(layout.salmon_raw_counts(level)));
        }
        for level in branches.quant.iter().copied() {
            salmon_counts_files.push(PathBuf::from(layout.salmon_tpm_counts(level)));
        }

        // Per-analysis report bundles; empty when no analyses are configured.
        let mapper_reports: Vec<PathBuf> = if analyses.is_empty() {
            Vec::new()
        } else {
            analyses
                .iter()
                .map(|a| PathBuf::from(layout.mapper_report_html(&a.name)))
                .chain([PathBuf::from(layout.mapper_collated_results())])
                .collect()
        };
        let salmon_reports = |level: QuantLevel| -> Vec<PathBuf> {
            if analyses.is_empty() || !branches.quantifies(level) {
                return Vec::new();
            }
            analyses
                .iter()
                .map(|a| PathBuf::from(layout.salmon_report_html(&a.name, level)))
                .chain([PathBuf::from(layout.salmon_collated_results(level))])
                .collect()
        };
        let salmon_transcript_reports = salmon_reports(QuantLevel::Transcripts);
        let salmon_gene_reports = salmon_reports(QuantLevel::Genes);

        let mut final_report: Vec<PathBuf> = vec![
            PathBuf::from(layout.annotation_stats()),
            PathBuf::from(layout.multiqc_report()),
        ];
        final_report.extend(salmon_counts_files.iter().cloned());
        final_report.push(PathBuf::from(layout.mapper_counts()));
        final_report.push(PathBuf::from(layout.mapper_norm_counts()));
        final_report.push(PathBuf::from(layout.mapper_size_factors()));
        final_report.extend(coverage_files.iter().cloned());
        final_report.extend(mapper_reports.iter().cloned());
        final_report.extend(salmon_transcript_reports.iter().cloned());
        final_report.extend(salmon_gene_reports.iter().cloned());

        let mut groups = vec![
            TargetGroup {
                name: HELP_TARGET.to_string(),
                description: "Print all target groups and their descriptions.".to_string(),
                files: Vec::new(),
            },
            TargetGroup {
                name: DEFAULT_TARGET.to_string(),
                description: "Produce a comprehensive report. This is the default target."
                    .to_string(),
                files: final_report,
            },
            TargetGroup {
                name: format!("{mapper}_map"),
                description: format!("Produce {mapper} mapping results in BAM file format."),
                files: samples.names().map(|n| PathBuf::from(layout.bam(n))).collect(),
            },
            TargetGroup {
                name: format!("{mapper}_counts"),
                description: format!("Get count matrix from {mapper} mapping results."),
                files: vec![PathBuf::from(layout.mapper_counts())],
            },
            TargetGroup {
                name: "genome_coverage".to_string(),
                description: "Compute genome coverage values from BAM files, in bigwig format."
                    .to_string(),
                files: coverage_files,
            },
            TargetGroup {
                name: "salmon_index".to_string(),
                description: "Create SALMON index file.".to_string(),
                files: vec![PathBuf::from(layout.salmon_index_marker())],
            },
            TargetGroup {
                name: "salmon_quant".to_string(),
                description: "Calculate read counts per transcript using SALMON.".to_string(),
                files: samples
                    .names()
                    .map(|n| PathBuf::from(layout.quant_sf(n)))
                    .chain(samples.names().map(|n| PathBuf::from(layout.quant_genes_sf(n))))
                    .collect(),
            },
            TargetGroup {
                name: "salmon_counts".to_string(),
                description: "Get count matrix from SALMON quant.".to_string(),
                files: salmon_counts_files,
            },
            TargetGroup {
                name: "multiqc".to_string(),
                description: "Get multiQC report based on alignments and QC reports.".to_string(),
                files: vec![PathBuf::from(layout.multiqc_report())],
            },
            TargetGroup {
                name: format!("deseq_report_{mapper}"),
                description: format!(
                    "Produce one HTML report for each analysis based on {mapper} results."
                ),
                files: mapper_reports,
            },
            TargetGroup {
                name: "deseq_report_salmon_transcripts".to_string(),
                description:
                    "Produce one HTML report for each analysis based on SALMON results at transcript level."
                        .to_string(),
                files: salmon_transcript_reports,
            },
            TargetGroup {
                name: "deseq_report_salmon_genes".to_string(),
                description:
                    "Produce one HTML report for each analysis based on SALMON results at gene level."
                        .to_string(),
                files: salmon_gene_reports,
            },
        ];

        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Self { groups }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetGroup> {
        self.groups.iter()
    }

    pub fn get(&self, name: &str) -> Option<&TargetGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    fn available(&self) -> String {
        self.groups
            .iter()
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Flatten the requested groups into the required-file set.
///
/// The result is deduplicated while preserving first-occurrence order, and
/// always ends with the annotations archive regardless of selection.
pub fn required_files(
    catalog: &TargetCatalog,
    requested: &[String],
    layout: &Layout,
) -> Result<Vec<PathBuf>> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut files: Vec<PathBuf> = Vec::new();

    for name in requested {
        let group = catalog
            .get(name)
            .ok_or_else(|| PipelineError::UnknownTargetError {
                name: name.clone(),
                available: catalog.available(),
            })?;
        for file in group.files.iter() {
            if seen.insert(file.clone()) {
                files.push(file.clone());
            }
        }
    }

    let archive = PathBuf::from(layout.annotations_archive());
    if seen.insert(archive.clone()) {
        files.push(archive);
    }

    Ok(files)
}

/// Transitive closure of tasks needed to produce every required file.
///
/// Required files without a producer are external inputs and contribute no
/// tasks. The returned IDs are sorted and deduplicated.
pub fn prune(graph: &TaskGraph, required: &[PathBuf]) -> Vec<TaskId> {
    let mut stack: Vec<TaskId> = required
        .iter()
        .filter_map(|file| graph.producer_of(file))
        .collect();
    let mut keep: HashSet<TaskId> = HashSet::new();

    while let Some(id) = stack.pop() {
        if !keep.insert(id) {
            continue;
        }
        stack.extend(graph.node(id).deps.iter().copied());
    }

    let mut kept: Vec<TaskId> = keep.into_iter().collect();
    kept.sort_unstable();

    debug!(
        required = required.len(),
        kept = kept.len(),
        total = graph.len(),
        "pruned task graph to requested targets"
    );

    kept
}

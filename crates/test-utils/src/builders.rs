#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use seqflow::analysis::{analyses_from_config, AnalysisSpec};
use seqflow::branch::{self, BranchSelection};
use seqflow::config::{
    AnalysisConfig, ConfigFile, CoverageSection, ExecutionSection, Locations, MappingSection,
    QuantificationSection, RawConfigFile, ReportSection, RuleResources, SampleConfig,
};
use seqflow::graph::{
    build_catalog, build_graph, required_files, Layout, RuleTemplate, TargetCatalog, TaskGraph,
};
use seqflow::samples::SampleRegistry;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from a minimal valid configuration: default branch selection,
/// default budgets, no samples, no analyses. Paths are relative so tests can
/// anchor them under a tempdir by prefixing `output_dir`/`reads_dir`.
pub struct ConfigBuilder {
    config: RawConfigFile,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                locations: Locations {
                    genome_fasta: PathBuf::from("genome.fa"),
                    cdna_fasta: PathBuf::from("cdna.fa"),
                    gtf_file: PathBuf::from("genes.gtf"),
                    reads_dir: PathBuf::from("reads"),
                    output_dir: PathBuf::from("output"),
                    scripts_dir: PathBuf::from("scripts"),
                    data_dir: PathBuf::from("share"),
                },
                mapping: MappingSection::default(),
                coverage: CoverageSection::default(),
                quantification: QuantificationSection::default(),
                execution: ExecutionSection::default(),
                tools: BTreeMap::new(),
                report: ReportSection::default(),
                analysis: BTreeMap::new(),
                sample: Vec::new(),
            },
        }
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.locations.output_dir = dir.into();
        self
    }

    pub fn reads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.locations.reads_dir = dir.into();
        self
    }

    pub fn mapper(mut self, mapper: &str) -> Self {
        self.config.mapping.mapper = mapper.to_string();
        self
    }

    pub fn genome_build(mut self, build: &str) -> Self {
        self.config.mapping.genome_build = build.to_string();
        self
    }

    pub fn coverage_tool(mut self, tool: &str) -> Self {
        self.config.coverage.tool = tool.to_string();
        self
    }

    pub fn quant_levels(mut self, levels: &[&str]) -> Self {
        self.config.quantification.levels = levels.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn budget(mut self, memory_mb: u64, threads: u32) -> Self {
        self.config.execution.total_memory_mb = memory_mb;
        self.config.execution.total_threads = threads;
        self
    }

    pub fn rule_resources(mut self, rule: &str, memory_mb: u64, threads: u32) -> Self {
        self.config
            .execution
            .rules
            .insert(rule.to_string(), RuleResources { memory_mb, threads });
        self
    }

    pub fn default_targets(mut self, targets: &[&str]) -> Self {
        self.config.execution.targets = targets.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a paired-end sample with conventional read file names.
    pub fn paired_sample(self, name: &str, group: &str) -> Self {
        self.sample(SampleConfig {
            name: name.to_string(),
            reads: Some(format!("{name}_R1.fastq.gz")),
            reads2: Some(format!("{name}_R2.fastq.gz")),
            extra: BTreeMap::from([("group".to_string(), group.to_string())]),
        })
    }

    /// Add a single-end sample with a conventional read file name.
    pub fn single_sample(self, name: &str, group: &str) -> Self {
        self.sample(SampleConfig {
            name: name.to_string(),
            reads: Some(format!("{name}.fastq.gz")),
            reads2: None,
            extra: BTreeMap::from([("group".to_string(), group.to_string())]),
        })
    }

    pub fn sample(mut self, sample: SampleConfig) -> Self {
        self.config.sample.push(sample);
        self
    }

    pub fn analysis(mut self, name: &str, case: &str, control: &str) -> Self {
        self.config.analysis.insert(
            name.to_string(),
            AnalysisConfig {
                description: format!("{case} versus {control}."),
                case_sample_groups: case.to_string(),
                control_sample_groups: control.to_string(),
                covariates: None,
                self_contained: None,
            },
        );
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    /// The raw config, for tests exercising validation failures directly.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything derived from one validated config, built the way `run` builds
/// it, for tests that need a graph or target catalog without the CLI.
pub struct PipelineFixture {
    pub cfg: ConfigFile,
    pub samples: SampleRegistry,
    pub branches: BranchSelection,
    pub analyses: Vec<AnalysisSpec>,
    pub layout: Layout,
    pub catalog: Vec<RuleTemplate>,
    pub targets: TargetCatalog,
}

impl PipelineFixture {
    pub fn from_config(cfg: ConfigFile) -> Self {
        let samples = SampleRegistry::from_config(&cfg.sample).expect("valid samples");
        let branches = branch::resolve(&cfg).expect("valid branch selection");
        let analyses = analyses_from_config(&cfg);
        let layout = Layout::new(&cfg, &branches);
        let catalog = build_catalog(
            &cfg,
            &branches,
            &layout,
            &samples,
            &analyses,
            Path::new("seqflow.toml"),
            false,
        );
        let targets = TargetCatalog::build(&layout, &branches, &samples, &analyses);
        Self {
            cfg,
            samples,
            branches,
            analyses,
            layout,
            catalog,
            targets,
        }
    }

    pub fn graph(&self) -> TaskGraph {
        build_graph(&self.catalog, &self.layout, &self.samples, &self.analyses)
            .expect("graph builds")
    }

    pub fn required(&self, targets: &[&str]) -> Vec<PathBuf> {
        let requested: Vec<String> = targets.iter().map(|s| s.to_string()).collect();
        required_files(&self.targets, &requested, &self.layout).expect("targets resolve")
    }
}

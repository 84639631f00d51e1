// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [locations]
/// genome_fasta = "genome.fa"
/// cdna_fasta = "cdna.fa"
/// gtf_file = "genes.gtf"
/// reads_dir = "reads"
/// output_dir = "output"
///
/// [mapping]
/// mapper = "star"
/// genome_build = "hg38"
///
/// [coverage]
/// tool = "bamCoverage"
///
/// [analysis.treated_vs_control]
/// description = "Treated against control."
/// case_sample_groups = "treated"
/// control_sample_groups = "control"
///
/// [[sample]]
/// name = "sampleA"
/// reads = "sampleA_R1.fastq.gz"
/// reads2 = "sampleA_R2.fastq.gz"
/// group = "treated"
/// ```
///
/// Sections other than `[locations]` and `[[sample]]` are optional and have
/// reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Input/output filesystem locations from `[locations]`.
    pub locations: Locations,

    /// Mapping-tool branch selection from `[mapping]`.
    #[serde(default)]
    pub mapping: MappingSection,

    /// Coverage-tool branch selection from `[coverage]`.
    #[serde(default)]
    pub coverage: CoverageSection,

    /// Quantification granularity selection from `[quantification]`.
    #[serde(default)]
    pub quantification: QuantificationSection,

    /// Execution budgets, default targets and per-rule resources.
    #[serde(default)]
    pub execution: ExecutionSection,

    /// External tool executables from `[tools.<name>]`.
    #[serde(default)]
    pub tools: BTreeMap<String, ToolConfig>,

    /// Report rendering defaults from `[report]`.
    #[serde(default)]
    pub report: ReportSection,

    /// Downstream comparison definitions from `[analysis.<name>]`.
    #[serde(default)]
    pub analysis: BTreeMap<String, AnalysisConfig>,

    /// Sample records from `[[sample]]`, in sheet order.
    #[serde(default)]
    pub sample: Vec<SampleConfig>,
}

/// Validated configuration.
///
/// Constructed from [`RawConfigFile`] via `TryFrom`, which runs the semantic
/// checks in `config::validate`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub locations: Locations,
    pub mapping: MappingSection,
    pub coverage: CoverageSection,
    pub quantification: QuantificationSection,
    pub execution: ExecutionSection,
    pub tools: BTreeMap<String, ToolConfig>,
    pub report: ReportSection,
    pub analysis: BTreeMap<String, AnalysisConfig>,
    pub sample: Vec<SampleConfig>,
}

impl ConfigFile {
    /// Construct without validation. Used by `TryFrom<RawConfigFile>` after
    /// the raw config has been checked.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            locations: raw.locations,
            mapping: raw.mapping,
            coverage: raw.coverage,
            quantification: raw.quantification,
            execution: raw.execution,
            tools: raw.tools,
            report: raw.report,
            analysis: raw.analysis,
            sample: raw.sample,
        }
    }

    /// Resolved command prefix for an external tool: `executable` plus
    /// `args` from `[tools.<name>]`, falling back to the tool name itself
    /// when the section is absent.
    pub fn tool(&self, name: &str) -> String {
        match self.tools.get(name) {
            Some(t) if t.args.is_empty() => t.executable.clone(),
            Some(t) => format!("{} {}", t.executable, t.args),
            None => name.to_string(),
        }
    }
}

/// `[locations]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct Locations {
    pub genome_fasta: PathBuf,
    pub cdna_fasta: PathBuf,
    pub gtf_file: PathBuf,
    pub reads_dir: PathBuf,
    pub output_dir: PathBuf,

    /// Directory holding the helper scripts invoked by report/count rules.
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,

    /// Directory holding static assets (report logo).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("scripts")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("share")
}

/// `[mapping]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingSection {
    /// `"star"` or `"hisat2"`.
    #[serde(default = "default_mapper")]
    pub mapper: String,

    /// Genome build tag used in index file names (e.g. `"hg38"`).
    #[serde(default = "default_genome_build")]
    pub genome_build: String,
}

fn default_mapper() -> String {
    "star".to_string()
}

fn default_genome_build() -> String {
    "genome".to_string()
}

impl Default for MappingSection {
    fn default() -> Self {
        Self {
            mapper: default_mapper(),
            genome_build: default_genome_build(),
        }
    }
}

/// `[coverage]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CoverageSection {
    /// `"bamCoverage"` or `"megadepth"`.
    #[serde(default = "default_coverage_tool")]
    pub tool: String,
}

fn default_coverage_tool() -> String {
    "bamCoverage".to_string()
}

impl Default for CoverageSection {
    fn default() -> Self {
        Self {
            tool: default_coverage_tool(),
        }
    }
}

/// `[quantification]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct QuantificationSection {
    /// Any non-empty subset of `"transcripts"` and `"genes"`.
    #[serde(default = "default_quant_levels")]
    pub levels: Vec<String>,
}

fn default_quant_levels() -> Vec<String> {
    vec!["transcripts".to_string(), "genes".to_string()]
}

impl Default for QuantificationSection {
    fn default() -> Self {
        Self {
            levels: default_quant_levels(),
        }
    }
}

/// `[execution]` section: global budgets, default targets and per-rule
/// resource reservations under `[execution.rules.<rule>]`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionSection {
    /// Target groups to build when none are given on the command line.
    #[serde(default)]
    pub targets: Vec<String>,

    /// Global memory budget shared by all concurrently running tasks.
    #[serde(default = "default_total_memory_mb")]
    pub total_memory_mb: u64,

    /// Global thread budget shared by all concurrently running tasks.
    #[serde(default = "default_total_threads")]
    pub total_threads: u32,

    /// Per-rule overrides of the default reservation.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleResources>,
}

fn default_total_memory_mb() -> u64 {
    16384
}

fn default_total_threads() -> u32 {
    8
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            total_memory_mb: default_total_memory_mb(),
            total_threads: default_total_threads(),
            rules: BTreeMap::new(),
        }
    }
}

impl ExecutionSection {
    /// Reservation for a rule, falling back to the default when no
    /// `[execution.rules.<rule>]` section exists.
    pub fn rule_resources(&self, rule: &str) -> RuleResources {
        self.rules.get(rule).cloned().unwrap_or_default()
    }
}

/// `[execution.rules.<rule>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleResources {
    #[serde(default = "default_rule_memory_mb")]
    pub memory_mb: u64,

    #[serde(default = "default_rule_threads")]
    pub threads: u32,
}

fn default_rule_memory_mb() -> u64 {
    1024
}

fn default_rule_threads() -> u32 {
    1
}

impl Default for RuleResources {
    fn default() -> Self {
        Self {
            memory_mb: default_rule_memory_mb(),
            threads: default_rule_threads(),
        }
    }
}

/// `[tools.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolConfig {
    pub executable: String,

    #[serde(default)]
    pub args: String,
}

/// `[report]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSection {
    /// Default for per-analysis `self_contained` when unspecified.
    #[serde(default = "default_self_contained")]
    pub self_contained: bool,
}

fn default_self_contained() -> bool {
    true
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            self_contained: default_self_contained(),
        }
    }
}

/// `[analysis.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    pub description: String,
    pub case_sample_groups: String,
    pub control_sample_groups: String,

    /// Defaults to no covariates.
    #[serde(default)]
    pub covariates: Option<String>,

    /// Falls back to `[report].self_contained`.
    #[serde(default)]
    pub self_contained: Option<bool>,
}

/// `[[sample]]` table.
///
/// `name` is mandatory; `reads`/`reads2` determine the read layout; any
/// further keys are opaque grouping attributes reachable only through
/// `SampleRegistry::lookup`.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleConfig {
    pub name: String,

    #[serde(default)]
    pub reads: Option<String>,

    #[serde(default)]
    pub reads2: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

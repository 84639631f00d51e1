// src/branch.rs

//! Branch resolution: one concrete variant per multi-way decision point.
//!
//! Every selection is validated against its closed enumeration before any
//! graph construction starts, so a bad configuration never produces a
//! partially built graph.

use std::collections::BTreeSet;
use std::str::FromStr;

use crate::config::ConfigFile;
use crate::errors::{PipelineError, Result};

/// Mapping-tool branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapper {
    Star,
    Hisat2,
}

impl Mapper {
    /// Path segment used under `mapped_reads/`, `bigwig_files/` etc.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mapper::Star => "star",
            Mapper::Hisat2 => "hisat2",
        }
    }
}

impl FromStr for Mapper {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "star" => Ok(Mapper::Star),
            "hisat2" => Ok(Mapper::Hisat2),
            other => Err(PipelineError::ConfigError(format!(
                "invalid [mapping].mapper '{}' (allowed: \"star\", \"hisat2\")",
                other
            ))),
        }
    }
}

/// Coverage-tool branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageTool {
    BamCoverage,
    Megadepth,
}

impl CoverageTool {
    /// Path segment used under `bigwig_files/<mapper>/`.
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageTool::BamCoverage => "bamCoverage",
            CoverageTool::Megadepth => "megadepth",
        }
    }
}

impl FromStr for CoverageTool {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bamCoverage" => Ok(CoverageTool::BamCoverage),
            "megadepth" => Ok(CoverageTool::Megadepth),
            other => Err(PipelineError::ConfigError(format!(
                "invalid [coverage].tool '{}' (allowed: \"bamCoverage\", \"megadepth\")",
                other
            ))),
        }
    }
}

/// Quantification granularity. Non-exclusive: any non-empty subset may be
/// selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QuantLevel {
    Transcripts,
    Genes,
}

impl QuantLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuantLevel::Transcripts => "transcripts",
            QuantLevel::Genes => "genes",
        }
    }
}

impl FromStr for QuantLevel {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "transcripts" => Ok(QuantLevel::Transcripts),
            "genes" => Ok(QuantLevel::Genes),
            other => Err(PipelineError::ConfigError(format!(
                "invalid [quantification].levels entry '{}' (allowed: \"transcripts\", \"genes\")",
                other
            ))),
        }
    }
}

/// Immutable branch selection consumed by the graph builder and the target
/// catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchSelection {
    pub mapper: Mapper,
    pub coverage: CoverageTool,
    pub quant: BTreeSet<QuantLevel>,
}

impl BranchSelection {
    pub fn quantifies(&self, level: QuantLevel) -> bool {
        self.quant.contains(&level)
    }
}

/// Resolve and validate all branch selections from the configuration.
pub fn resolve(cfg: &ConfigFile) -> Result<BranchSelection> {
    let mapper = cfg.mapping.mapper.parse::<Mapper>()?;
    let coverage = cfg.coverage.tool.parse::<CoverageTool>()?;

    let mut quant = BTreeSet::new();
    for level in cfg.quantification.levels.iter() {
        quant.insert(level.parse::<QuantLevel>()?);
    }
    if quant.is_empty() {
        return Err(PipelineError::ConfigError(
            "[quantification].levels must select at least one of \"transcripts\", \"genes\""
                .to_string(),
        ));
    }

    Ok(BranchSelection {
        mapper,
        coverage,
        quant,
    })
}

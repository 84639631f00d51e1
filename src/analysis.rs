// src/analysis.rs

//! Downstream comparison definitions, constructed once from configuration.

use crate::config::ConfigFile;

/// A named downstream comparison with its report parameters.
///
/// Optional config fields are resolved here: `covariates` defaults to empty
/// and `self_contained` falls back to the global `[report]` default. Read-only
/// after construction.
#[derive(Debug, Clone)]
pub struct AnalysisSpec {
    pub name: String,
    pub description: String,
    pub case_sample_groups: String,
    pub control_sample_groups: String,
    pub covariates: String,
    pub self_contained: bool,
}

/// Build the analysis list in config order (BTreeMap gives a stable order).
pub fn analyses_from_config(cfg: &ConfigFile) -> Vec<AnalysisSpec> {
    cfg.analysis
        .iter()
        .map(|(name, a)| AnalysisSpec {
            name: name.clone(),
            description: a.description.clone(),
            case_sample_groups: a.case_sample_groups.clone(),
            control_sample_groups: a.control_sample_groups.clone(),
            covariates: a.covariates.clone().unwrap_or_default(),
            self_contained: a.self_contained.unwrap_or(cfg.report.self_contained),
        })
        .collect()
}

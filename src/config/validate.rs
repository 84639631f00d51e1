// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile, RuleResources};
use crate::errors::{PipelineError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_samples(cfg)?;
    validate_samples(cfg)?;
    validate_execution(cfg)?;
    validate_analyses(cfg)?;
    Ok(())
}

fn ensure_has_samples(cfg: &RawConfigFile) -> Result<()> {
    if cfg.sample.is_empty() {
        return Err(PipelineError::SchemaError(
            "config must contain at least one [[sample]] table".to_string(),
        ));
    }
    Ok(())
}

fn validate_samples(cfg: &RawConfigFile) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();

    for sample in cfg.sample.iter() {
        if sample.name.is_empty() {
            return Err(PipelineError::SchemaError(
                "sample with empty 'name' field".to_string(),
            ));
        }
        if !seen.insert(sample.name.as_str()) {
            return Err(PipelineError::SchemaError(format!(
                "duplicate sample name '{}'",
                sample.name
            )));
        }

        // A sample is single-end with exactly one reads field and paired-end
        // with two; zero populated reads fields is invalid.
        let populated = [&sample.reads, &sample.reads2]
            .iter()
            .filter(|r| r.as_deref().is_some_and(|s| !s.is_empty()))
            .count();
        if populated == 0 {
            return Err(PipelineError::SchemaError(format!(
                "sample '{}' has no reads file ('reads' must be set; 'reads2' only for paired-end)",
                sample.name
            )));
        }
        if populated == 2 && sample.reads.as_deref().unwrap_or("").is_empty() {
            return Err(PipelineError::SchemaError(format!(
                "sample '{}' sets 'reads2' without 'reads'",
                sample.name
            )));
        }
    }

    Ok(())
}

fn validate_execution(cfg: &RawConfigFile) -> Result<()> {
    if cfg.execution.total_memory_mb == 0 {
        return Err(PipelineError::ConfigError(
            "[execution].total_memory_mb must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.execution.total_threads == 0 {
        return Err(PipelineError::ConfigError(
            "[execution].total_threads must be >= 1 (got 0)".to_string(),
        ));
    }

    // Rules without an [execution.rules] override reserve the default, so a
    // budget below it could never admit them.
    let default = RuleResources::default();
    if cfg.execution.total_memory_mb < default.memory_mb {
        return Err(PipelineError::ConfigError(format!(
            "[execution].total_memory_mb ({}) is below the default rule reservation ({} MB)",
            cfg.execution.total_memory_mb, default.memory_mb
        )));
    }

    for (rule, res) in cfg.execution.rules.iter() {
        if res.memory_mb > cfg.execution.total_memory_mb {
            return Err(PipelineError::ConfigError(format!(
                "[execution.rules.{}].memory_mb ({}) exceeds the global budget ({})",
                rule, res.memory_mb, cfg.execution.total_memory_mb
            )));
        }
        if res.threads > cfg.execution.total_threads {
            return Err(PipelineError::ConfigError(format!(
                "[execution.rules.{}].threads ({}) exceeds the global budget ({})",
                rule, res.threads, cfg.execution.total_threads
            )));
        }
    }

    Ok(())
}

fn validate_analyses(cfg: &RawConfigFile) -> Result<()> {
    for (name, analysis) in cfg.analysis.iter() {
        if analysis.case_sample_groups.is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "[analysis.{}] has empty case_sample_groups",
                name
            )));
        }
        if analysis.control_sample_groups.is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "[analysis.{}] has empty control_sample_groups",
                name
            )));
        }
    }
    Ok(())
}

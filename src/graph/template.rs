// src/graph/template.rs

//! Rule templates and placeholder binding.
//!
//! A [`RuleTemplate`] is a parameterized unit of work. Binding substitutes
//! `{placeholder}` markers with literal values; partial substitution is not
//! permitted, so any marker left unresolved fails the build.

use std::collections::BTreeMap;

use crate::errors::{PipelineError, Result};

/// Declared resource reservation of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resources {
    pub memory_mb: u64,
    pub threads: u32,
}

/// Axis along which a template is instantiated into concrete tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// One task total (e.g. index building).
    Singleton,
    /// One task per sample.
    PerSample,
    /// One task per configured analysis.
    PerAnalysis,
}

/// Restriction of a `PerSample` template to a read layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFilter {
    Any,
    PairedOnly,
    SingleOnly,
}

/// Declared input of a template.
#[derive(Debug, Clone)]
pub enum InputSpec {
    /// A path pattern, possibly containing `{sample}` / `{analysis}`.
    Path(String),
    /// The sample's raw reads files under the reads directory (one or two
    /// paths depending on layout).
    RawReads,
    /// The sample's trimmed reads (R1+R2 for paired-end, one file for
    /// single-end).
    TrimmedReads,
}

/// A named unit of work in the build-time catalog. Never mutated after
/// startup.
#[derive(Debug, Clone)]
pub struct RuleTemplate {
    pub name: String,
    pub axis: Axis,
    pub filter: SampleFilter,
    pub inputs: Vec<InputSpec>,
    /// Output path patterns. Placeholders must be fully bound per instance.
    pub outputs: Vec<String>,
    /// Command template. Besides `{sample}` / `{analysis}`, the builder binds
    /// `{input}`, `{inputN}`, `{output}`, `{outputN}`, `{log}` and the
    /// per-analysis report parameters.
    pub cmd: String,
    /// Variant used for single-end samples where the invocation differs
    /// (read-file arguments). `None` means `cmd` covers both layouts.
    pub cmd_single: Option<String>,
    /// Per-task log file pattern.
    pub log: String,
    pub resources: Resources,
}

impl RuleTemplate {
    pub fn singleton(name: &str) -> RuleTemplateBuilder {
        RuleTemplateBuilder::new(name, Axis::Singleton)
    }

    pub fn per_sample(name: &str) -> RuleTemplateBuilder {
        RuleTemplateBuilder::new(name, Axis::PerSample)
    }

    pub fn per_analysis(name: &str) -> RuleTemplateBuilder {
        RuleTemplateBuilder::new(name, Axis::PerAnalysis)
    }
}

/// Builder keeping catalog construction readable; the catalog is the only
/// producer of templates.
pub struct RuleTemplateBuilder {
    template: RuleTemplate,
}

impl RuleTemplateBuilder {
    fn new(name: &str, axis: Axis) -> Self {
        Self {
            template: RuleTemplate {
                name: name.to_string(),
                axis,
                filter: SampleFilter::Any,
                inputs: Vec::new(),
                outputs: Vec::new(),
                cmd: String::new(),
                cmd_single: None,
                log: String::new(),
                resources: Resources {
                    memory_mb: 1024,
                    threads: 1,
                },
            },
        }
    }

    pub fn filter(mut self, filter: SampleFilter) -> Self {
        self.template.filter = filter;
        self
    }

    pub fn input(mut self, path: impl Into<String>) -> Self {
        self.template.inputs.push(InputSpec::Path(path.into()));
        self
    }

    pub fn raw_reads(mut self) -> Self {
        self.template.inputs.push(InputSpec::RawReads);
        self
    }

    pub fn trimmed_reads(mut self) -> Self {
        self.template.inputs.push(InputSpec::TrimmedReads);
        self
    }

    pub fn output(mut self, path: impl Into<String>) -> Self {
        self.template.outputs.push(path.into());
        self
    }

    pub fn cmd(mut self, cmd: impl Into<String>) -> Self {
        self.template.cmd = cmd.into();
        self
    }

    pub fn cmd_single(mut self, cmd: impl Into<String>) -> Self {
        self.template.cmd_single = Some(cmd.into());
        self
    }

    pub fn log(mut self, log: impl Into<String>) -> Self {
        self.template.log = log.into();
        self
    }

    pub fn resources(mut self, resources: Resources) -> Self {
        self.template.resources = resources;
        self
    }

    pub fn build(self) -> RuleTemplate {
        self.template
    }
}

/// Substitute `{key}` markers from `vars` into `pattern`.
///
/// Fails with a `TemplateBindingError` if any marker remains unresolved
/// afterwards, naming the rule and the offending placeholder.
pub fn bind(rule: &str, pattern: &str, vars: &BTreeMap<&str, String>) -> Result<String> {
    let mut bound = pattern.to_string();
    for (key, value) in vars {
        bound = bound.replace(&format!("{{{}}}", key), value);
    }

    if let Some(placeholder) = first_unbound_placeholder(&bound) {
        return Err(PipelineError::TemplateBindingError {
            rule: rule.to_string(),
            placeholder,
        });
    }

    Ok(bound)
}

fn first_unbound_placeholder(s: &str) -> Option<String> {
    let start = s.find('{')?;
    let rest = &s[start + 1..];
    let end = rest.find('}')?;
    Some(rest[..end].to_string())
}

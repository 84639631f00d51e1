// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Construction-time errors (`Config`, `Schema`, `TemplateBinding`,
//! `GraphConflict`, `Cycle`, `UnknownTarget`) abort the run before any task
//! executes. Execution-time errors (`MissingInput`, `TaskExecution`) are
//! scoped to the failing task and its downstream closure.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Sample sheet error: {0}")]
    SchemaError(String),

    #[error("Unbound placeholder '{{{placeholder}}}' in rule '{rule}'")]
    TemplateBindingError { rule: String, placeholder: String },

    #[error("Output '{path}' is produced by both '{first}' and '{second}'")]
    GraphConflictError {
        path: String,
        first: String,
        second: String,
    },

    #[error("Cycle detected in task graph involving '{0}'")]
    CycleError(String),

    #[error("Unknown target '{name}' (available: {available})")]
    UnknownTargetError { name: String, available: String },

    #[error("Input file '{path}' required by '{task}' does not exist")]
    MissingInputError { task: String, path: String },

    #[error("Task execution failed: {0}")]
    TaskExecutionError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;

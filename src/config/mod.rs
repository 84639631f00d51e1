// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] maps the TOML schema onto Rust types.
//! - [`loader`] reads and deserializes the file.
//! - [`validate`] runs the semantic checks behind
//!   `ConfigFile::try_from(RawConfigFile)`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    AnalysisConfig, ConfigFile, CoverageSection, ExecutionSection, Locations, MappingSection,
    QuantificationSection, RawConfigFile, ReportSection, RuleResources, SampleConfig, ToolConfig,
};

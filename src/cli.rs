// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `seqflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "seqflow",
    version,
    about = "Build and execute the per-sample processing pipeline for the requested targets.",
    long_about = None
)]
pub struct CliArgs {
    /// Target groups to produce.
    ///
    /// Defaults to the targets configured under `[execution]`, or
    /// `final-report` if none are configured. The pseudo-target `help`
    /// prints every target group with its description.
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `seqflow.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "seqflow.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SEQFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Build the graph, print the tasks that would run, but execute nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

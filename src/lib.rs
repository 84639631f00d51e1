// src/lib.rs

pub mod analysis;
pub mod branch;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod graph;
pub mod logging;
pub mod report;
pub mod samples;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::analysis::analyses_from_config;
use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::errors::PipelineError;
use crate::exec::{
    RealExecutorBackend, ResourceBudget, RunSummary, Runtime, RuntimeEvent, Scheduler,
};
use crate::fs::{FileSystem, RealFileSystem};
use crate::graph::{
    build_catalog, build_graph, prune, required_files, Layout, TargetCatalog, DEFAULT_TARGET,
    HELP_TARGET,
};
use crate::report::ChangeReporter;
use crate::samples::SampleRegistry;

/// Environment variable marking a from-source checkout, which changes where
/// static report assets are looked up.
pub const UNINSTALLED_ENV: &str = "SEQFLOW_UNINSTALLED";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - branch resolution and catalog expansion
/// - target resolution and graph pruning
/// - scheduler / runtime / executor
/// - Ctrl-C handling
/// - the post-run generated-files report
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let samples = SampleRegistry::from_config(&cfg.sample)?;
    let branches = branch::resolve(&cfg)?;
    let analyses = analyses_from_config(&cfg);
    let layout = Layout::new(&cfg, &branches);

    let uninstalled = std::env::var_os(UNINSTALLED_ENV).is_some();
    let catalog = build_catalog(
        &cfg,
        &branches,
        &layout,
        &samples,
        &analyses,
        &config_path,
        uninstalled,
    );
    let target_catalog = TargetCatalog::build(&layout, &branches, &samples, &analyses);

    let requested = requested_targets(&args, &cfg);
    info!(targets = ?requested, "resolving requested targets");

    if requested.iter().any(|t| t == HELP_TARGET) {
        print_targets(&target_catalog);
    }

    let graph = build_graph(&catalog, &layout, &samples, &analyses)?;
    let required = required_files(&target_catalog, &requested, &layout)?;
    let pruned = prune(&graph, &required);

    debug!(
        tasks = graph.len(),
        in_run = pruned.len(),
        required_files = required.len(),
        "task graph ready"
    );

    if args.dry_run {
        print_dry_run(&graph, &pruned);
        return Ok(());
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let reporter = ChangeReporter::snapshot(&required, fs.as_ref());

    let budget = ResourceBudget {
        memory_mb: cfg.execution.total_memory_mb,
        threads: cfg.execution.total_threads,
    };
    let scheduler = Scheduler::new(Arc::new(graph), pruned, budget, fs.clone());

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = RealExecutorBackend::new(rt_tx.clone());

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let runtime = Runtime::new(scheduler, rt_rx, executor);
    let summary = runtime.run().await?;

    report_summary(&summary, &reporter, fs.as_ref())
}

/// Targets from the command line, falling back to `[execution].targets`,
/// falling back to the default target.
fn requested_targets(args: &CliArgs, cfg: &config::ConfigFile) -> Vec<String> {
    if !args.targets.is_empty() {
        return args.targets.clone();
    }
    if !cfg.execution.targets.is_empty() {
        return cfg.execution.targets.clone();
    }
    vec![DEFAULT_TARGET.to_string()]
}

fn print_targets(catalog: &TargetCatalog) {
    println!("available targets:");
    for group in catalog.iter() {
        println!("  {}", group.name);
        println!("      {}", group.description);
    }
    println!();
}

/// Dry-run output: the tasks that would run, with commands.
fn print_dry_run(graph: &graph::TaskGraph, pruned: &[graph::TaskId]) {
    println!("seqflow dry-run");
    println!();
    println!("tasks ({}):", pruned.len());
    for &id in pruned {
        let node = graph.node(id);
        println!("  - {}", node.label());
        println!("      cmd: {}", node.cmd);
        if !node.deps.is_empty() {
            let deps: Vec<String> = node
                .deps
                .iter()
                .map(|&dep| graph.node(dep).label())
                .collect();
            println!("      after: {deps:?}");
        }
    }

    debug!("dry-run complete (no execution)");
}

fn report_summary(
    summary: &RunSummary,
    reporter: &ChangeReporter,
    fs: &dyn FileSystem,
) -> Result<()> {
    info!(
        executed = summary.executed.len(),
        skipped = summary.skipped.len(),
        failed = summary.failed.len(),
        cancelled = summary.cancelled.len(),
        "run finished"
    );

    if summary.is_success() {
        let changed = reporter.changed_files(fs);
        if changed.is_empty() {
            println!("Nothing to be done: all requested files are up to date.");
        } else {
            println!("The following files have been generated:");
            for file in changed {
                println!("  {}", file.display());
            }
        }
        return Ok(());
    }

    if summary.interrupted {
        return Err(
            PipelineError::TaskExecutionError("run interrupted before all tasks finished".into())
                .into(),
        );
    }

    let mut lines = Vec::new();
    for (label, reason) in summary.failed.iter() {
        lines.push(format!("  {label}: {reason}"));
    }
    for label in summary.cancelled.iter() {
        lines.push(format!("  {label}: cancelled due to upstream failure"));
    }
    Err(PipelineError::TaskExecutionError(format!(
        "{} task(s) did not complete:\n{}",
        lines.len(),
        lines.join("\n")
    ))
    .into())
}

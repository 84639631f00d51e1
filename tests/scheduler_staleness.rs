// tests/scheduler_staleness.rs

//! Scheduler semantics exercised synchronously against a mock filesystem.

use std::sync::Arc;

use seqflow::exec::{
    NodeState, ResourceBudget, Scheduler, SchedulerStep, TaskFailure, TaskOutcome,
};
use seqflow::fs::MockFileSystem;
use seqflow::graph::{build_graph, Resources, RuleTemplate, TaskGraph, TaskId};
use seqflow_test_utils::builders::{ConfigBuilder, PipelineFixture};
use seqflow_test_utils::init_tracing;

fn graph_of(catalog: Vec<RuleTemplate>) -> Arc<TaskGraph> {
    let fixture = PipelineFixture::from_config(
        ConfigBuilder::new().paired_sample("alpha", "a").build(),
    );
    Arc::new(
        build_graph(&catalog, &fixture.layout, &fixture.samples, &fixture.analyses)
            .expect("graph builds"),
    )
}

fn step(name: &str, input: &str, output: &str) -> RuleTemplate {
    RuleTemplate::singleton(name)
        .input(input)
        .output(output)
        .cmd("true")
        .log(format!("logs/{name}.log"))
        .build()
}

fn sized_step(name: &str, input: &str, output: &str, memory_mb: u64, threads: u32) -> RuleTemplate {
    RuleTemplate::singleton(name)
        .input(input)
        .output(output)
        .cmd("true")
        .log(format!("logs/{name}.log"))
        .resources(Resources { memory_mb, threads })
        .build()
}

fn id_of(graph: &TaskGraph, rule: &str) -> TaskId {
    graph
        .nodes()
        .iter()
        .find(|n| n.rule == rule)
        .map(|n| n.id)
        .unwrap_or_else(|| panic!("no task for rule '{rule}'"))
}

fn all_ids(graph: &TaskGraph) -> Vec<TaskId> {
    (0..graph.len()).collect()
}

fn big_budget() -> ResourceBudget {
    ResourceBudget {
        memory_mb: 1 << 20,
        threads: 1 << 10,
    }
}

fn dispatched(step: &SchedulerStep) -> Vec<String> {
    step.to_dispatch.iter().map(|c| c.label.clone()).collect()
}

#[test]
fn fresh_outputs_skip_the_whole_run() {
    init_tracing();
    let graph = graph_of(vec![
        step("extract", "in.txt", "a.out"),
        step("transform", "a.out", "b.out"),
        step("publish", "b.out", "c.out"),
    ]);
    let fs = MockFileSystem::new();
    fs.touch("in.txt", 1);
    fs.touch("a.out", 2);
    fs.touch("b.out", 3);
    fs.touch("c.out", 4);

    let mut scheduler =
        Scheduler::new(graph.clone(), all_ids(&graph), big_budget(), Arc::new(fs));
    let step = scheduler.start();

    assert!(step.to_dispatch.is_empty());
    assert!(step.finished);
    assert_eq!(scheduler.labels_in_state(NodeState::Skipped).len(), 3);
    assert!(!scheduler.any_failed());
}

#[test]
fn equal_mtimes_count_as_fresh() {
    init_tracing();
    let graph = graph_of(vec![step("extract", "in.txt", "a.out")]);
    let fs = MockFileSystem::new();
    fs.touch("in.txt", 5);
    fs.touch("a.out", 5);

    let mut scheduler =
        Scheduler::new(graph.clone(), all_ids(&graph), big_budget(), Arc::new(fs));
    let step = scheduler.start();

    assert!(step.to_dispatch.is_empty());
    assert!(step.finished);
}

#[test]
fn missing_output_reruns_the_producer_and_its_dependents() {
    init_tracing();
    let graph = graph_of(vec![
        step("extract", "in.txt", "a.out"),
        step("transform", "a.out", "b.out"),
        step("publish", "b.out", "c.out"),
    ]);
    let transform = id_of(&graph, "transform");
    let publish = id_of(&graph, "publish");

    let fs = MockFileSystem::new();
    fs.touch("in.txt", 1);
    fs.touch("a.out", 2);
    // b.out was deleted; c.out is present but will be older than the fresh b.out.
    fs.touch("c.out", 4);

    let mut scheduler = Scheduler::new(
        graph.clone(),
        all_ids(&graph),
        big_budget(),
        Arc::new(fs.clone()),
    );

    let step = scheduler.start();
    assert_eq!(dispatched(&step), vec!["transform"]);
    assert_eq!(scheduler.state_of(id_of(&graph, "extract")), Some(NodeState::Skipped));

    fs.touch("b.out", 10);
    let step = scheduler.handle_completion(transform, TaskOutcome::Success);
    assert_eq!(dispatched(&step), vec!["publish"]);

    fs.touch("c.out", 11);
    let step = scheduler.handle_completion(publish, TaskOutcome::Success);
    assert!(step.finished);
    assert_eq!(
        scheduler.labels_in_state(NodeState::Succeeded),
        vec!["transform", "publish"]
    );
}

#[test]
fn stale_input_newer_than_output_triggers_a_rerun() {
    init_tracing();
    let graph = graph_of(vec![step("extract", "in.txt", "a.out")]);
    let fs = MockFileSystem::new();
    fs.touch("in.txt", 9);
    fs.touch("a.out", 3);

    let mut scheduler =
        Scheduler::new(graph.clone(), all_ids(&graph), big_budget(), Arc::new(fs));
    let step = scheduler.start();
    assert_eq!(dispatched(&step), vec!["extract"]);
}

#[test]
fn failure_cancels_the_downstream_closure_only() {
    init_tracing();
    let graph = graph_of(vec![
        step("extract", "in.txt", "a.out"),
        step("left", "a.out", "left.out"),
        step("right", "a.out", "right.out"),
        RuleTemplate::singleton("join")
            .input("left.out")
            .input("right.out")
            .output("joined.out")
            .cmd("true")
            .log("logs/join.log")
            .build(),
        step("sibling", "in.txt", "sibling.out"),
    ]);
    let extract = id_of(&graph, "extract");
    let sibling = id_of(&graph, "sibling");

    let fs = MockFileSystem::new();
    fs.touch("in.txt", 1);

    let mut scheduler =
        Scheduler::new(graph.clone(), all_ids(&graph), big_budget(), Arc::new(fs));
    let step = scheduler.start();
    let mut launched = dispatched(&step);
    launched.sort();
    assert_eq!(launched, vec!["extract", "sibling"]);

    let step = scheduler.handle_completion(
        extract,
        TaskOutcome::Failed(TaskFailure::NonZeroExit(2)),
    );
    let mut failed = step.newly_failed.clone();
    failed.sort();
    assert_eq!(failed, vec!["extract", "join", "left", "right"]);
    assert!(!step.finished, "the sibling is still running");

    let step = scheduler.handle_completion(sibling, TaskOutcome::Success);
    assert!(step.finished);
    assert_eq!(scheduler.labels_in_state(NodeState::Succeeded), vec!["sibling"]);
    assert_eq!(
        scheduler.labels_in_state(NodeState::Cancelled),
        vec!["left", "right", "join"]
    );

    let failures: Vec<_> = scheduler.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0.rule, "extract");
    assert!(failures[0].1.contains("status 2"));
}

#[test]
fn missing_leaf_input_fails_without_dispatching() {
    init_tracing();
    let graph = graph_of(vec![
        step("extract", "absent.txt", "a.out"),
        step("transform", "a.out", "b.out"),
    ]);

    let fs = MockFileSystem::new();

    let mut scheduler =
        Scheduler::new(graph.clone(), all_ids(&graph), big_budget(), Arc::new(fs));
    let step = scheduler.start();

    assert!(step.to_dispatch.is_empty());
    assert!(step.finished);
    assert_eq!(step.newly_failed, vec!["extract", "transform"]);

    let failures: Vec<_> = scheduler.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].1.contains("absent.txt"));
}

#[test]
fn admission_respects_the_resource_budget() {
    init_tracing();
    let graph = graph_of(vec![
        sized_step("one", "in.txt", "one.out", 1024, 1),
        sized_step("two", "in.txt", "two.out", 1024, 1),
        sized_step("three", "in.txt", "three.out", 1024, 1),
    ]);
    let fs = MockFileSystem::new();
    fs.touch("in.txt", 1);

    let budget = ResourceBudget {
        memory_mb: 2048,
        threads: 8,
    };
    let mut scheduler = Scheduler::new(graph.clone(), all_ids(&graph), budget, Arc::new(fs));

    let step = scheduler.start();
    assert_eq!(step.to_dispatch.len(), 2, "only two reservations fit");
    let first = step.to_dispatch[0].id;

    let step = scheduler.handle_completion(first, TaskOutcome::Success);
    assert_eq!(step.to_dispatch.len(), 1, "freed budget admits the third");
}

#[test]
fn oversized_reservations_fail_instead_of_stalling_the_run() {
    init_tracing();
    let graph = graph_of(vec![
        sized_step("huge", "in.txt", "huge.out", 4096, 1),
        step("after", "huge.out", "after.out"),
    ]);
    let fs = MockFileSystem::new();
    fs.touch("in.txt", 1);

    let budget = ResourceBudget {
        memory_mb: 2048,
        threads: 8,
    };
    let mut scheduler = Scheduler::new(graph.clone(), all_ids(&graph), budget, Arc::new(fs));

    let step = scheduler.start();
    assert!(step.to_dispatch.is_empty());
    assert!(step.finished, "no completion event will ever arrive");
    assert_eq!(step.newly_failed, vec!["huge", "after"]);

    let failures: Vec<_> = scheduler.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].1.contains("4096") && failures[0].1.contains("2048"));
    assert_eq!(
        scheduler.state_of(id_of(&graph, "after")),
        Some(NodeState::Cancelled)
    );
}

#[test]
fn admission_prefers_tasks_unblocking_more_work() {
    init_tracing();
    let graph = graph_of(vec![
        sized_step("chain_head", "in.txt", "chain1.out", 1024, 1),
        sized_step("chain_mid", "chain1.out", "chain2.out", 1024, 1),
        sized_step("chain_tail", "chain2.out", "chain3.out", 1024, 1),
        sized_step("loner", "in.txt", "loner.out", 1024, 1),
    ]);
    let fs = MockFileSystem::new();
    fs.touch("in.txt", 1);

    // Room for a single task at a time.
    let budget = ResourceBudget {
        memory_mb: 1024,
        threads: 8,
    };
    let mut scheduler = Scheduler::new(graph.clone(), all_ids(&graph), budget, Arc::new(fs));

    let step = scheduler.start();
    assert_eq!(dispatched(&step), vec!["chain_head"]);
}

#[test]
fn tasks_outside_the_pruned_set_are_ignored() {
    init_tracing();
    let graph = graph_of(vec![
        step("wanted", "in.txt", "wanted.out"),
        step("unwanted", "in.txt", "unwanted.out"),
    ]);
    let wanted = id_of(&graph, "wanted");

    let fs = MockFileSystem::new();
    fs.touch("in.txt", 1);

    let mut scheduler =
        Scheduler::new(graph.clone(), vec![wanted], big_budget(), Arc::new(fs));
    let step = scheduler.start();
    assert_eq!(dispatched(&step), vec!["wanted"]);

    let step = scheduler.handle_completion(wanted, TaskOutcome::Success);
    assert!(step.finished);
    assert_eq!(scheduler.state_of(id_of(&graph, "unwanted")), None);
}

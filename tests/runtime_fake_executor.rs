// tests/runtime_fake_executor.rs

//! End-to-end runtime runs over the real graph with a fake executor.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use seqflow::exec::{ResourceBudget, Runtime, RuntimeEvent, Scheduler};
use seqflow::fs::MockFileSystem;
use seqflow::graph::{prune, DEFAULT_TARGET};
use seqflow_test_utils::builders::{ConfigBuilder, PipelineFixture};
use seqflow_test_utils::fake_executor::FakeExecutor;
use seqflow_test_utils::{init_tracing, with_timeout};

fn fixture() -> PipelineFixture {
    PipelineFixture::from_config(
        ConfigBuilder::new()
            .paired_sample("alpha", "treated")
            .single_sample("beta", "control")
            .build(),
    )
}

/// Mock filesystem with every external leaf input present and no outputs.
fn fs_with_leaf_inputs(fixture: &PipelineFixture) -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.touch("genome.fa", 1);
    fs.touch("cdna.fa", 1);
    fs.touch("genes.gtf", 1);
    fs.touch("seqflow.toml", 1);
    for record in fixture.samples.iter() {
        for file in record.reads_files() {
            fs.touch(fixture.layout.reads_dir.join(file), 1);
        }
    }
    fs
}

fn budget() -> ResourceBudget {
    ResourceBudget {
        memory_mb: 1 << 20,
        threads: 1 << 10,
    }
}

#[tokio::test]
async fn full_run_executes_every_pruned_task() {
    init_tracing();
    with_timeout(async {
        let fixture = fixture();
        let graph = Arc::new(fixture.graph());
        let required = fixture.required(&[DEFAULT_TARGET]);
        let pruned = prune(&graph, &required);
        let fs = fs_with_leaf_inputs(&fixture);

        let scheduler = Scheduler::new(graph.clone(), pruned.clone(), budget(), Arc::new(fs));

        let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
        let executed = Arc::new(Mutex::new(Vec::new()));
        let executor = FakeExecutor::new(tx, Arc::clone(&executed));

        let summary = Runtime::new(scheduler, rx, executor).run().await.unwrap();

        assert!(summary.is_success());
        assert!(summary.skipped.is_empty(), "nothing existed beforehand");
        assert_eq!(summary.executed.len(), pruned.len());

        let executed = executed.lock().unwrap();
        assert_eq!(executed.len(), pruned.len());
        // Upstream tasks ran before their dependents.
        for &id in pruned.iter() {
            let node = graph.node(id);
            let position = executed.iter().position(|l| *l == node.label()).unwrap();
            for &dep in node.deps.iter() {
                let dep_position = executed
                    .iter()
                    .position(|l| *l == graph.node(dep).label())
                    .unwrap();
                assert!(
                    dep_position < position,
                    "{} ran before its dependency {}",
                    node.label(),
                    graph.node(dep).label()
                );
            }
        }
    })
    .await;
}

#[tokio::test]
async fn a_failing_task_fails_only_its_subtree() {
    init_tracing();
    with_timeout(async {
        let fixture = fixture();
        let graph = Arc::new(fixture.graph());
        let required = fixture.required(&[DEFAULT_TARGET]);
        let pruned = prune(&graph, &required);
        let fs = fs_with_leaf_inputs(&fixture);

        let scheduler = Scheduler::new(graph.clone(), pruned, budget(), Arc::new(fs));

        let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
        let executed = Arc::new(Mutex::new(Vec::new()));
        let executor =
            FakeExecutor::new(tx, Arc::clone(&executed)).failing(&["star_map[alpha]"]);

        let summary = Runtime::new(scheduler, rx, executor).run().await.unwrap();

        assert!(!summary.is_success());
        assert!(!summary.interrupted);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "star_map[alpha]");

        // Everything behind the failed mapping is cancelled.
        assert!(summary.cancelled.contains(&"index_bam[alpha]".to_string()));
        assert!(summary.cancelled.contains(&"multiqc".to_string()));

        // The salmon side does not read BAM files and still completes, as
        // does the other sample's mapping.
        assert!(summary.executed.contains(&"salmon_quant[alpha]".to_string()));
        assert!(summary.executed.contains(&"star_map[beta]".to_string()));
        assert!(summary.executed.contains(&"counts_from_salmon".to_string()));
    })
    .await;
}

#[tokio::test]
async fn fresh_outputs_produce_an_empty_run() {
    init_tracing();
    with_timeout(async {
        let fixture = fixture();
        let graph = Arc::new(fixture.graph());
        let required = fixture.required(&[DEFAULT_TARGET]);
        let pruned = prune(&graph, &required);

        // Leaf inputs are old, every task output is newer.
        let fs = fs_with_leaf_inputs(&fixture);
        for &id in pruned.iter() {
            for output in graph.node(id).outputs.iter() {
                fs.touch(output, 10);
            }
        }

        let scheduler = Scheduler::new(graph.clone(), pruned.clone(), budget(), Arc::new(fs));

        let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
        let executed = Arc::new(Mutex::new(Vec::new()));
        let executor = FakeExecutor::new(tx, Arc::clone(&executed));

        let summary = Runtime::new(scheduler, rx, executor).run().await.unwrap();

        assert!(summary.is_success());
        assert!(summary.executed.is_empty());
        assert_eq!(summary.skipped.len(), pruned.len());
        assert!(executed.lock().unwrap().is_empty());
    })
    .await;
}

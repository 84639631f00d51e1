// tests/property_graph.rs

//! Property tests over randomly shaped sample sets and branch selections.

use std::sync::Arc;

use proptest::prelude::*;

use seqflow::config::ConfigFile;
use seqflow::exec::{ResourceBudget, Scheduler};
use seqflow::fs::MockFileSystem;
use seqflow::graph::{prune, DEFAULT_TARGET};
use seqflow_test_utils::builders::{ConfigBuilder, PipelineFixture};

/// A config with 1..=6 samples of random read layout and a random branch
/// selection.
fn config_strategy() -> impl Strategy<Value = ConfigFile> {
    (
        proptest::collection::vec(any::<bool>(), 1..=6),
        prop_oneof![Just("star"), Just("hisat2")],
        prop_oneof![Just("bamCoverage"), Just("megadepth")],
    )
        .prop_map(|(layouts, mapper, coverage)| {
            let mut builder = ConfigBuilder::new().mapper(mapper).coverage_tool(coverage);
            for (i, paired) in layouts.into_iter().enumerate() {
                let name = format!("sample_{i}");
                builder = if paired {
                    builder.paired_sample(&name, "a")
                } else {
                    builder.single_sample(&name, "a")
                };
            }
            builder.build()
        })
}

proptest! {
    #[test]
    fn graphs_always_build_acyclically(cfg in config_strategy()) {
        let fixture = PipelineFixture::from_config(cfg);
        // build_graph runs the toposort check internally.
        let graph = fixture.graph();
        prop_assert!(!graph.is_empty());
    }

    #[test]
    fn per_sample_rules_scale_with_the_sample_count(cfg in config_strategy()) {
        let n = cfg.sample.len();
        let fixture = PipelineFixture::from_config(cfg);
        let graph = fixture.graph();

        for rule in ["salmon_quant", "index_bam", "count_reads"] {
            let count = graph.nodes().iter().filter(|t| t.rule == rule).count();
            prop_assert_eq!(count, n, "rule {}", rule);
        }

        let trims = graph
            .nodes()
            .iter()
            .filter(|t| t.rule.starts_with("trim_qc_reads"))
            .count();
        prop_assert_eq!(trims, n);
    }

    #[test]
    fn required_files_resolve_to_producers(cfg in config_strategy()) {
        let fixture = PipelineFixture::from_config(cfg);
        let graph = fixture.graph();

        let once = fixture.required(&[DEFAULT_TARGET]);
        let twice = fixture.required(&[DEFAULT_TARGET, DEFAULT_TARGET]);
        prop_assert_eq!(&once, &twice);

        for file in once.iter() {
            prop_assert!(graph.producer_of(file).is_some(), "{}", file.display());
        }
    }

    #[test]
    fn an_up_to_date_tree_schedules_nothing(cfg in config_strategy()) {
        let fixture = PipelineFixture::from_config(cfg);
        let graph = Arc::new(fixture.graph());
        let required = fixture.required(&[DEFAULT_TARGET]);
        let pruned = prune(&graph, &required);

        // Same mtime everywhere counts as fresh.
        let fs = MockFileSystem::new();
        for &id in pruned.iter() {
            let node = graph.node(id);
            for path in node.inputs.iter().chain(node.outputs.iter()) {
                fs.touch(path, 5);
            }
        }

        let budget = ResourceBudget { memory_mb: 1 << 20, threads: 1 << 10 };
        let total = pruned.len();
        let mut scheduler = Scheduler::new(graph, pruned, budget, Arc::new(fs));
        let step = scheduler.start();

        prop_assert!(step.to_dispatch.is_empty());
        prop_assert!(step.finished);
        prop_assert_eq!(
            scheduler.labels_in_state(seqflow::exec::NodeState::Skipped).len(),
            total
        );
    }
}

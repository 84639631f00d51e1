// tests/config_and_samples.rs

use std::collections::BTreeMap;
use std::io::Write;

use seqflow::config::{load_and_validate, ConfigFile, SampleConfig};
use seqflow::errors::PipelineError;
use seqflow::samples::{ReadLayout, SampleRegistry, Selector};
use seqflow_test_utils::builders::ConfigBuilder;
use seqflow_test_utils::init_tracing;

const EXAMPLE_CONFIG: &str = r#"
[locations]
genome_fasta = "genome.fa"
cdna_fasta = "cdna.fa"
gtf_file = "genes.gtf"
reads_dir = "reads"
output_dir = "output"

[mapping]
mapper = "hisat2"
genome_build = "hg38"

[execution]
total_memory_mb = 32768
total_threads = 16

[execution.rules.hisat2_index]
memory_mb = 8192
threads = 4

[tools.Rscript]
executable = "/usr/bin/Rscript"
args = "--vanilla"

[analysis.treated_vs_control]
description = "Treated samples against controls."
case_sample_groups = "treated"
control_sample_groups = "control"

[[sample]]
name = "alpha"
reads = "alpha_R1.fastq.gz"
reads2 = "alpha_R2.fastq.gz"
group = "treated"

[[sample]]
name = "beta"
reads = "beta.fastq.gz"
group = "control"
"#;

#[test]
fn loads_a_full_config_file() {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(EXAMPLE_CONFIG.as_bytes()).unwrap();

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.mapping.mapper, "hisat2");
    assert_eq!(cfg.mapping.genome_build, "hg38");
    assert_eq!(cfg.execution.total_threads, 16);
    assert_eq!(cfg.execution.rule_resources("hisat2_index").threads, 4);
    // Unknown rules fall back to the defaults.
    assert_eq!(cfg.execution.rule_resources("star_map").memory_mb, 1024);
    assert_eq!(cfg.tool("Rscript"), "/usr/bin/Rscript --vanilla");
    assert_eq!(cfg.tool("samtools"), "samtools");
    assert_eq!(cfg.sample.len(), 2);
    assert_eq!(cfg.sample[1].extra.get("group").unwrap(), "control");
    assert_eq!(cfg.analysis.len(), 1);
}

#[test]
fn missing_config_file_is_an_io_error() {
    init_tracing();
    let err = load_and_validate("no/such/seqflow.toml").unwrap_err();
    assert!(matches!(err, PipelineError::IoError(_)));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"[locations\ngenome_fasta = ").unwrap();

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, PipelineError::TomlError(_)));
}

#[test]
fn a_config_without_samples_is_rejected() {
    init_tracing();
    let raw = ConfigBuilder::new().build_raw();
    let err = ConfigFile::try_from(raw).unwrap_err();
    match err {
        PipelineError::SchemaError(msg) => assert!(msg.contains("[[sample]]")),
        other => panic!("expected SchemaError, got {other:?}"),
    }
}

#[test]
fn duplicate_sample_names_are_rejected() {
    init_tracing();
    let raw = ConfigBuilder::new()
        .paired_sample("alpha", "a")
        .paired_sample("alpha", "b")
        .build_raw();
    let err = ConfigFile::try_from(raw).unwrap_err();
    match err {
        PipelineError::SchemaError(msg) => assert!(msg.contains("alpha")),
        other => panic!("expected SchemaError, got {other:?}"),
    }
}

#[test]
fn reads2_without_reads_is_rejected() {
    init_tracing();
    let raw = ConfigBuilder::new()
        .sample(SampleConfig {
            name: "alpha".to_string(),
            reads: None,
            reads2: Some("alpha_R2.fastq.gz".to_string()),
            extra: BTreeMap::new(),
        })
        .build_raw();
    assert!(matches!(
        ConfigFile::try_from(raw).unwrap_err(),
        PipelineError::SchemaError(_)
    ));
}

#[test]
fn per_rule_reservations_must_fit_the_global_budget() {
    init_tracing();
    let raw = ConfigBuilder::new()
        .paired_sample("alpha", "a")
        .budget(4096, 4)
        .rule_resources("star_index", 32768, 2)
        .build_raw();
    let err = ConfigFile::try_from(raw).unwrap_err();
    match err {
        PipelineError::ConfigError(msg) => {
            assert!(msg.contains("star_index") && msg.contains("32768"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn the_budget_must_cover_the_default_reservation() {
    init_tracing();
    let raw = ConfigBuilder::new()
        .paired_sample("alpha", "a")
        .budget(512, 8)
        .build_raw();
    let err = ConfigFile::try_from(raw).unwrap_err();
    match err {
        PipelineError::ConfigError(msg) => {
            assert!(msg.contains("512") && msg.contains("1024"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn read_layout_follows_the_populated_fields() {
    init_tracing();
    let cfg = ConfigBuilder::new()
        .paired_sample("alpha", "a")
        .single_sample("beta", "b")
        .build();
    let registry = SampleRegistry::from_config(&cfg.sample).unwrap();

    assert_eq!(registry.layout_of("alpha"), Some(ReadLayout::Paired));
    assert_eq!(registry.layout_of("beta"), Some(ReadLayout::Single));
    assert_eq!(
        registry.get("alpha").unwrap().reads_files(),
        vec!["alpha_R1.fastq.gz", "alpha_R2.fastq.gz"]
    );
    assert_eq!(
        registry.get("beta").unwrap().reads_files(),
        vec!["beta.fastq.gz"]
    );
}

#[test]
fn lookup_selects_fields_by_column_value() {
    init_tracing();
    let cfg = ConfigBuilder::new()
        .paired_sample("alpha", "treated")
        .paired_sample("beta", "control")
        .single_sample("gamma", "treated")
        .build();
    let registry = SampleRegistry::from_config(&cfg.sample).unwrap();

    let names = registry
        .lookup("group", Selector::Exact("treated"), &["name"])
        .unwrap();
    assert_eq!(names, vec!["alpha", "gamma"]);

    // Predicate selectors work on any column.
    let reads = registry
        .lookup("reads2", Selector::Predicate(&|v| !v.is_empty()), &["reads", "reads2"])
        .unwrap();
    assert_eq!(
        reads,
        vec![
            "alpha_R1.fastq.gz",
            "alpha_R2.fastq.gz",
            "beta_R1.fastq.gz",
            "beta_R2.fastq.gz"
        ]
    );

    // Matching nothing is fine, a missing column is not.
    let none = registry
        .lookup("group", Selector::Exact("unknown"), &["name"])
        .unwrap();
    assert!(none.is_empty());
    assert!(matches!(
        registry.lookup("tissue", Selector::Exact("liver"), &["name"]),
        Err(PipelineError::SchemaError(_))
    ));
}

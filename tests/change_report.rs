// tests/change_report.rs

use std::path::PathBuf;

use seqflow::fs::MockFileSystem;
use seqflow::report::ChangeReporter;
use seqflow_test_utils::init_tracing;

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

#[test]
fn reports_new_and_modified_files_in_order() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.touch("out/a.tsv", 1);
    fs.touch("out/c.tsv", 1);

    let expected = paths(&["out/a.tsv", "out/b.tsv", "out/c.tsv"]);
    let reporter = ChangeReporter::snapshot(&expected, &fs);

    // a is rewritten, b appears, c stays untouched.
    fs.touch("out/a.tsv", 5);
    fs.touch("out/b.tsv", 5);

    assert_eq!(
        reporter.changed_files(&fs),
        paths(&["out/a.tsv", "out/b.tsv"])
    );
}

#[test]
fn untouched_runs_report_nothing() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.touch("out/a.tsv", 3);
    fs.touch("out/b.tsv", 4);

    let expected = paths(&["out/a.tsv", "out/b.tsv"]);
    let reporter = ChangeReporter::snapshot(&expected, &fs);

    assert!(reporter.changed_files(&fs).is_empty());
}

#[test]
fn files_removed_after_the_snapshot_are_not_reported() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.touch("out/a.tsv", 3);

    let expected = paths(&["out/a.tsv", "out/b.tsv"]);
    let reporter = ChangeReporter::snapshot(&expected, &fs);

    fs.remove("out/a.tsv");

    assert!(reporter.changed_files(&fs).is_empty());
}

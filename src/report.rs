// src/report.rs

//! Change reporting over the expected output files of a run.
//!
//! A snapshot of modification times is taken before execution; afterwards the
//! same file list is probed again and every file that appeared or changed is
//! reported. Skipped tasks leave their outputs untouched, so the report only
//! names files actually (re)generated by this run.

use std::path::PathBuf;
use std::time::SystemTime;

use crate::fs::FileSystem;

/// Pre-run mtime snapshot of the expected files, in required-file order.
#[derive(Debug)]
pub struct ChangeReporter {
    entries: Vec<(PathBuf, Option<SystemTime>)>,
}

impl ChangeReporter {
    /// Record the current state of every expected file. Absent files are
    /// recorded as `None`.
    pub fn snapshot(files: &[PathBuf], fs: &dyn FileSystem) -> Self {
        let entries = files
            .iter()
            .map(|file| (file.clone(), fs.mtime(file).ok()))
            .collect();
        Self { entries }
    }

    /// Files that now exist and either did not exist at snapshot time or
    /// carry a different mtime. Order matches the snapshot.
    pub fn changed_files(&self, fs: &dyn FileSystem) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter(|(file, before)| match fs.mtime(file) {
                Ok(now) => before.map_or(true, |then| then != now),
                Err(_) => false,
            })
            .map(|(file, _)| file.clone())
            .collect()
    }
}

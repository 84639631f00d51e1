// src/fs/mock.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use anyhow::{anyhow, Result};

use super::FileSystem;

/// In-memory filesystem with explicit modification times.
///
/// Times are expressed as whole seconds past the epoch so tests can write
/// `fs.touch("a.bam", 10)` and reason about relative ages directly.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, SystemTime>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update a file with the given modification time.
    pub fn touch(&self, path: impl AsRef<Path>, mtime_secs: u64) {
        let mut files = self.files.lock().unwrap();
        files.insert(
            path.as_ref().to_path_buf(),
            SystemTime::UNIX_EPOCH + Duration::from_secs(mtime_secs),
        );
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let mut files = self.files.lock().unwrap();
        files.remove(path.as_ref());
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(path)
    }

    fn mtime(&self, path: &Path) -> Result<SystemTime> {
        let files = self.files.lock().unwrap();
        files
            .get(path)
            .copied()
            .ok_or_else(|| anyhow!("file not found: {:?}", path))
    }
}

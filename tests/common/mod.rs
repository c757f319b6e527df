//! Common test utilities for texflat integration tests.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

/// An on-disk LaTeX project fixture backed by a temp directory.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp project"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file (creating parent directories) and return `self` for
    /// chaining.
    pub fn file(self, rel: &str, content: &str) -> Self {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(path, content).expect("write fixture file");
        self
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

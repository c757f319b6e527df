//! Resolution report
//!
//! A write-once-per-run accumulator for everything that was resolved,
//! skipped or failed during a resolution run. Non-fatal conditions are
//! always recorded here rather than raised individually; the caller reads
//! the report after the run to decide how to proceed.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Outcome recorded for one project file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileStatus {
    /// Loaded and available for flattening / merging
    Resolved,
    /// Referenced but not found (or unreadable)
    Missing,
    /// Target of a dropped cycle-closing edge
    Cyclic,
    /// Asset reference, tracked but never substituted
    SkippedAsset,
    /// Present under the root but unreachable from the entry document
    Skipped,
}

/// Per-file record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub status: FileStatus,
}

/// One dropped cycle-closing edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleRecord {
    /// File whose directive closed the cycle
    pub from: PathBuf,
    /// File the dropped edge pointed back to
    pub to: PathBuf,
}

/// One citation-key collision between two bibliography sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCollision {
    pub key: String,
    /// Source whose entry was kept (earliest in discovery order)
    pub kept: PathBuf,
    /// Source whose entry was discarded
    pub discarded: PathBuf,
}

/// Accumulated outcome of one resolution run
///
/// Mutated only while the run is in progress; read-only once `resolve`
/// returns. Serializes to JSON for machine consumers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionReport {
    files: Vec<FileRecord>,
    cycles: Vec<CycleRecord>,
    collisions: Vec<KeyCollision>,
}

impl ResolutionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome for a file. Exact duplicates are dropped; a
    /// `Cyclic` outcome upgrades an earlier `Resolved` record for the same
    /// path.
    pub fn record(&mut self, path: &Path, status: FileStatus) {
        if let Some(existing) = self.files.iter_mut().find(|r| r.path == path) {
            if existing.status == status {
                return;
            }
            if status == FileStatus::Cyclic && existing.status == FileStatus::Resolved {
                existing.status = FileStatus::Cyclic;
                return;
            }
        }
        if self
            .files
            .iter()
            .any(|r| r.path == path && r.status == status)
        {
            return;
        }
        self.files.push(FileRecord {
            path: path.to_path_buf(),
            status,
        });
    }

    /// Record a dropped cycle-closing edge.
    pub fn record_cycle(&mut self, from: &Path, to: &Path) {
        self.cycles.push(CycleRecord {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
    }

    /// Record a citation-key collision.
    pub fn record_collision(&mut self, key: &str, kept: &Path, discarded: &Path) {
        self.collisions.push(KeyCollision {
            key: key.to_string(),
            kept: kept.to_path_buf(),
            discarded: discarded.to_path_buf(),
        });
    }

    /// All per-file records, in recording order.
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// Dropped cycle edges, in discovery order.
    pub fn cycles(&self) -> &[CycleRecord] {
        &self.cycles
    }

    /// Key collisions, in discovery order.
    pub fn collisions(&self) -> &[KeyCollision] {
        &self.collisions
    }

    /// Paths recorded as missing.
    pub fn missing(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .filter(|r| r.status == FileStatus::Missing)
            .map(|r| r.path.as_path())
    }

    pub fn missing_count(&self) -> usize {
        self.missing().count()
    }

    pub fn has_missing(&self) -> bool {
        self.missing().next().is_some()
    }

    /// True when nothing was missing, cyclic or colliding.
    pub fn is_clean(&self) -> bool {
        !self.has_missing() && self.cycles.is_empty() && self.collisions.is_empty()
    }
}

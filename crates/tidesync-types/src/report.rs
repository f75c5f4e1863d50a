//! Operations and the change report
//!
//! The diff engine emits an ordered [`Operation`] list; the executor folds it
//! into a [`ChangeReport`], the sole observable outcome of a synchronization
//! call. The report is append-only while a run is in flight.

use crate::RelPath;
use serde::{Deserialize, Serialize};

/// One reconciliation step computed by the diff engine.
///
/// Operations are ordered so a container's creation always precedes any
/// operation referencing a path inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create a container at the target
    CreateContainer {
        /// Target path relative to the target root
        rel: RelPath,
    },
    /// Copy a leaf from source to target
    CopyLeaf {
        /// Path relative to both roots
        rel: RelPath,
        /// Size recorded at walk time, re-checked after the copy
        expected_size: u64,
    },
    /// Record a path the engine will not touch
    Skip {
        /// Path relative to the roots
        rel: RelPath,
        /// Why the path is skipped
        reason: String,
    },
}

impl Operation {
    /// The relative path this operation refers to
    pub fn rel(&self) -> &RelPath {
        match self {
            Self::CreateContainer { rel }
            | Self::CopyLeaf { rel, .. }
            | Self::Skip { rel, .. } => rel,
        }
    }
}

/// A completed (or planned, in dry-run mode) leaf copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRecord {
    /// Path relative to both roots
    pub rel: RelPath,
    /// Absolute source path, in string form
    pub source: String,
    /// Absolute target path, in string form
    pub target: String,
    /// Bytes transferred, or expected when planned
    pub bytes: u64,
}

/// A skipped path with its reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRecord {
    /// Path relative to the roots
    pub rel: RelPath,
    /// Why the path was skipped
    pub reason: String,
}

/// A recorded per-operation failure that did not abort the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Path relative to the roots
    pub rel: RelPath,
    /// Rendered cause
    pub cause: String,
}

/// Accumulated outcome of a synchronization call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeReport {
    /// Containers created (or to be created, in dry-run mode)
    pub containers_created: Vec<RelPath>,
    /// Leaf copies performed (or planned, in dry-run mode)
    pub copies: Vec<CopyRecord>,
    /// Paths skipped, with reasons
    pub skipped: Vec<SkipRecord>,
    /// Per-operation failures recorded under the ignore-error policy
    pub failures: Vec<FailureRecord>,
    /// Whether this report was produced without executing anything
    pub dry_run: bool,
    /// Whether the run stopped early on a cancellation signal
    pub cancelled: bool,
}

impl ChangeReport {
    /// Create an empty report
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Whether the run changed (or would change) nothing
    pub fn is_noop(&self) -> bool {
        self.containers_created.is_empty() && self.copies.is_empty()
    }

    /// Total bytes copied (or planned)
    pub fn bytes_copied(&self) -> u64 {
        self.copies.iter().map(|c| c.bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_rel_access() {
        let rel = RelPath::from_str_path("a/x.txt");
        let op = Operation::CopyLeaf {
            rel: rel.clone(),
            expected_size: 10,
        };
        assert_eq!(op.rel(), &rel);
    }

    #[test]
    fn test_report_noop_and_totals() {
        let mut report = ChangeReport::new(false);
        assert!(report.is_noop());

        report.copies.push(CopyRecord {
            rel: RelPath::from_str_path("a/x.txt"),
            source: "/src/a/x.txt".into(),
            target: "/dst/a/x.txt".into(),
            bytes: 10,
        });
        report.copies.push(CopyRecord {
            rel: RelPath::from_str_path("a/y.txt"),
            source: "/src/a/y.txt".into(),
            target: "/dst/a/y.txt".into(),
            bytes: 5,
        });

        assert!(!report.is_noop());
        assert_eq!(report.bytes_copied(), 15);
    }
}

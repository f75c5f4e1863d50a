//! Tree enumeration data model
//!
//! One walk over a subtree produces a sequence of [`WalkItem`]s: the entries
//! that could be read, and synthetic markers for the ones that could not.
//! Entries capture a frozen snapshot of size and content fingerprint so the
//! diff engine never re-probes a domain mid-comparison.

use crate::RelPath;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Kind of an existing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// A directory or collection, grouping other entries
    Container,
    /// A file or data object, holding bytes
    Leaf,
}

/// Result of a single existence/kind probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// The path points at a container
    Container,
    /// The path points at a leaf
    Leaf,
    /// Nothing exists at the path
    Missing,
}

impl PathKind {
    /// Whether anything exists at the probed path
    pub fn exists(self) -> bool {
        !matches!(self, Self::Missing)
    }
}

/// A domain-native proxy for content identity.
///
/// Checksums and modification times are never compared against each other;
/// when the two sides of a diff carry different fingerprint flavors the
/// comparison falls back to size alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fingerprint {
    /// A store-held or computed checksum, e.g. `sha2:<hex>`
    Checksum(String),
    /// Last modification time, the local filesystem's native signal
    Modified(SystemTime),
    /// The domain could not supply a fingerprint for this entry
    Unavailable,
}

impl Fingerprint {
    /// Compare two fingerprints of the same flavor; `None` when incomparable
    pub fn matches(&self, other: &Fingerprint) -> Option<bool> {
        match (self, other) {
            (Self::Checksum(a), Self::Checksum(b)) => Some(a == b),
            (Self::Modified(a), Self::Modified(b)) => Some(a == b),
            _ => None,
        }
    }
}

/// A direct child reported by a domain listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    /// Name of the child inside its parent
    pub name: String,
    /// Container or leaf
    pub kind: EntryKind,
    /// Size in bytes; zero for containers
    pub size: u64,
    /// Modification time when the domain tracks one
    pub modified: Option<SystemTime>,
}

/// One node discovered by a tree walk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Path relative to the walk root
    pub rel: RelPath,
    /// Container or leaf
    pub kind: EntryKind,
    /// Size in bytes; zero for containers
    pub size: u64,
    /// Frozen content fingerprint captured during the walk
    pub fingerprint: Fingerprint,
    /// Segments below the walk root; equals `rel.depth()`
    pub depth: usize,
    /// Number of direct children; zero for leaves
    pub child_count: usize,
}

impl TreeEntry {
    /// Whether this is a container with no direct children
    pub fn is_empty_container(&self) -> bool {
        self.kind == EntryKind::Container && self.child_count == 0
    }
}

/// One item yielded by a tree walk
#[derive(Debug, Clone)]
pub enum WalkItem {
    /// A readable entry
    Entry(TreeEntry),
    /// A node whose listing or metadata failed; reconciliation of the rest
    /// of the tree continues and this becomes a recorded skip.
    Unreadable {
        /// Path relative to the walk root
        rel: RelPath,
        /// Why the node could not be read
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_matching() {
        let a = Fingerprint::Checksum("sha2:aa".into());
        let b = Fingerprint::Checksum("sha2:bb".into());
        let t = Fingerprint::Modified(SystemTime::UNIX_EPOCH);

        assert_eq!(a.matches(&a.clone()), Some(true));
        assert_eq!(a.matches(&b), Some(false));
        assert_eq!(a.matches(&t), None);
        assert_eq!(t.matches(&Fingerprint::Unavailable), None);
    }

    #[test]
    fn test_path_kind_exists() {
        assert!(PathKind::Container.exists());
        assert!(PathKind::Leaf.exists());
        assert!(!PathKind::Missing.exists());
    }

    #[test]
    fn test_empty_container() {
        let entry = TreeEntry {
            rel: RelPath::from_str_path("a"),
            kind: EntryKind::Container,
            size: 0,
            fingerprint: Fingerprint::Unavailable,
            depth: 1,
            child_count: 0,
        };
        assert!(entry.is_empty_container());
    }
}

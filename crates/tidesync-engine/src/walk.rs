//! Lazy depth-bounded tree enumeration
//!
//! A [`TreeWalker`] drives a single forward pass over a subtree in pre-order,
//! one domain probe per step. It is not restartable: refreshing a view means
//! opening a new walker. A node whose listing or metadata fails is yielded as
//! an [`WalkItem::Unreadable`] marker so one bad node never aborts
//! reconciliation of the rest of the tree.

use std::collections::{BTreeMap, VecDeque};
use std::time::SystemTime;
use tidesync_types::{
    ChildEntry, EntryKind, Error, Fingerprint, PathKind, RelPath, Result, StorageDomain, SyncPath,
    TreeEntry, WalkItem,
};
use tracing::{debug, warn};

/// Options for one walk
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Maximum depth in segments below the root; `None` is unlimited
    pub max_depth: Option<usize>,
    /// Fingerprint leaves by checksum; otherwise by modification time
    pub compute_checksums: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            compute_checksums: true,
        }
    }
}

#[derive(Debug)]
struct QueuedNode {
    rel: RelPath,
    kind: EntryKind,
    size: u64,
    modified: Option<SystemTime>,
}

/// Single-pass pre-order enumerator over one subtree
pub struct TreeWalker<'a> {
    domain: &'a dyn StorageDomain,
    root: SyncPath,
    options: WalkOptions,
    queue: VecDeque<QueuedNode>,
}

impl std::fmt::Debug for TreeWalker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeWalker")
            .field("root", &self.root)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> TreeWalker<'a> {
    /// Open a walk rooted at an existing container.
    ///
    /// Fails with a walk error when the root is missing, is a leaf, or its
    /// top-level listing cannot be read.
    pub async fn open(
        domain: &'a dyn StorageDomain,
        root: &SyncPath,
        options: WalkOptions,
    ) -> Result<TreeWalker<'a>> {
        match domain.kind(root).await? {
            PathKind::Container => {}
            PathKind::Leaf => {
                return Err(Error::walk(root.to_string(), "root is not a container"))
            }
            PathKind::Missing => {
                return Err(Error::walk(root.to_string(), "root does not exist"))
            }
        }

        let children = domain
            .list_children(root)
            .await
            .map_err(|e| Error::walk(root.to_string(), format!("root is unreadable: {e}")))?;

        let mut walker = TreeWalker {
            domain,
            root: root.clone(),
            options,
            queue: VecDeque::new(),
        };
        walker.enqueue_front(&RelPath::new(Vec::new()), children);
        debug!("opened walk at {root}");
        Ok(walker)
    }

    fn enqueue_front(&mut self, parent: &RelPath, mut children: Vec<ChildEntry>) {
        children.sort_by(|a, b| a.name.cmp(&b.name));
        for child in children.into_iter().rev() {
            self.queue.push_front(QueuedNode {
                rel: parent.child(&child.name),
                kind: child.kind,
                size: child.size,
                modified: child.modified,
            });
        }
    }

    /// Yield the next item, or `None` when the walk is exhausted
    pub async fn next_item(&mut self) -> Option<WalkItem> {
        let node = self.queue.pop_front()?;
        let abs = self.root.join_rel(&node.rel);
        let depth = node.rel.depth();

        match node.kind {
            EntryKind::Leaf => {
                let fingerprint = self.leaf_fingerprint(&abs, node.modified).await;
                Some(WalkItem::Entry(TreeEntry {
                    rel: node.rel,
                    kind: EntryKind::Leaf,
                    size: node.size,
                    fingerprint,
                    depth,
                    child_count: 0,
                }))
            }
            EntryKind::Container => {
                // listed even at the depth bound so emptiness is known
                let children = match self.domain.list_children(&abs).await {
                    Ok(children) => children,
                    Err(e) => {
                        warn!("skipping unreadable container {abs}: {e}");
                        return Some(WalkItem::Unreadable {
                            rel: node.rel,
                            reason: e.to_string(),
                        });
                    }
                };
                let child_count = children.len();
                if self.options.max_depth.map_or(true, |max| depth < max) {
                    self.enqueue_front(&node.rel, children);
                }
                Some(WalkItem::Entry(TreeEntry {
                    rel: node.rel,
                    kind: EntryKind::Container,
                    size: 0,
                    fingerprint: Fingerprint::Unavailable,
                    depth,
                    child_count,
                }))
            }
        }
    }

    async fn leaf_fingerprint(
        &self,
        abs: &SyncPath,
        modified: Option<SystemTime>,
    ) -> Fingerprint {
        if self.options.compute_checksums {
            match self.domain.checksum(abs).await {
                Ok(checksum) => return Fingerprint::Checksum(checksum),
                Err(e) => {
                    // fall back to the coarser mtime signal
                    warn!("checksum unavailable for {abs}: {e}");
                }
            }
        }
        modified.map_or(Fingerprint::Unavailable, Fingerprint::Modified)
    }

    /// Drain the walk into an ordered snapshot.
    ///
    /// A duplicate relative path can only come from a broken domain listing,
    /// so it surfaces as a diff-invariant error rather than a guess.
    pub async fn collect(mut self) -> Result<TreeSnapshot> {
        let mut snapshot = TreeSnapshot::default();
        while let Some(item) = self.next_item().await {
            match item {
                WalkItem::Entry(entry) => {
                    let rel = entry.rel.clone();
                    if snapshot.entries.insert(rel.clone(), entry).is_some() {
                        return Err(Error::diff_invariant(format!(
                            "walk of '{}' produced '{rel}' twice",
                            self.root
                        )));
                    }
                }
                WalkItem::Unreadable { rel, reason } => {
                    snapshot.unreadable.push((rel, reason));
                }
            }
        }
        Ok(snapshot)
    }
}

/// Everything one walk saw, keyed and ordered parents-before-children
#[derive(Debug, Default)]
pub struct TreeSnapshot {
    /// Readable entries by relative path
    pub entries: BTreeMap<RelPath, TreeEntry>,
    /// Nodes that could not be read, with reasons
    pub unreadable: Vec<(RelPath, String)>,
}

//! Reconciliation of two tree snapshots
//!
//! A merge over the source and target snapshots, matched by relative path
//! with case-sensitive segment equality. The output is the minimal ordered
//! operation list making the target consistent with the source: the engine
//! never emits a delete, and identical leaves produce nothing at all so the
//! report stays focused on actionable items.

use crate::walk::TreeSnapshot;
use tidesync_types::{EntryKind, Operation, Result, TransferPolicy, TreeEntry};
use tracing::{debug, info};

/// Compute the ordered operation list turning `target` into a copy of `source`.
///
/// Snapshot iteration is parents-before-children, so every container creation
/// precedes the operations referencing paths inside it.
pub fn compute_operations(
    source: &TreeSnapshot,
    target: &TreeSnapshot,
    policy: &TransferPolicy,
) -> Result<Vec<Operation>> {
    let mut operations = Vec::new();

    for (rel, entry) in &source.entries {
        match (entry.kind, target.entries.get(rel)) {
            (EntryKind::Container, None) => {
                if !entry.is_empty_container() || policy.copy_empty_containers {
                    operations.push(Operation::CreateContainer { rel: rel.clone() });
                }
            }
            (EntryKind::Container, Some(existing)) if existing.kind == EntryKind::Container => {}
            (EntryKind::Leaf, None) => {
                operations.push(Operation::CopyLeaf {
                    rel: rel.clone(),
                    expected_size: entry.size,
                });
            }
            (EntryKind::Leaf, Some(existing)) if existing.kind == EntryKind::Leaf => {
                if leaf_needs_update(entry, existing, policy) {
                    debug!("leaf {rel} differs, scheduling update");
                    operations.push(Operation::CopyLeaf {
                        rel: rel.clone(),
                        expected_size: entry.size,
                    });
                }
            }
            (_, Some(_)) => {
                operations.push(Operation::Skip {
                    rel: rel.clone(),
                    reason: "kind mismatch".to_owned(),
                });
            }
        }
    }

    // entries present only in the target are left untouched by contract

    for (rel, reason) in source.unreadable.iter().chain(target.unreadable.iter()) {
        operations.push(Operation::Skip {
            rel: rel.clone(),
            reason: format!("unreadable: {reason}"),
        });
    }

    info!("diff produced {} operation(s)", operations.len());
    Ok(operations)
}

/// Size first; checksums only when sizes match and verification is requested.
///
/// Fingerprints of different flavors (a checksum against an mtime) are
/// incomparable: with equal sizes the leaf is then treated as identical, the
/// non-destructive reading of the coarser signal.
fn leaf_needs_update(source: &TreeEntry, target: &TreeEntry, policy: &TransferPolicy) -> bool {
    if source.size != target.size {
        return true;
    }
    if !policy.verify_checksum {
        return false;
    }
    matches!(source.fingerprint.matches(&target.fingerprint), Some(false))
}

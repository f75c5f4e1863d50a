//! Top-level synchronization entry point

use crate::diff::compute_operations;
use crate::executor::TransferExecutor;
use crate::walk::{TreeWalker, WalkOptions};
use std::sync::Arc;
use tidesync_types::{
    ChangeReport, Error, PathKind, StorageDomain, SyncFailure, SyncPath, TransferPolicy,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// One synchronization request: two rooted domains and a policy.
///
/// The engine is a pure function of this value; nothing about a previous run
/// is remembered, so re-running with unchanged trees converges to a no-op
/// report.
#[derive(Clone)]
pub struct SyncRequest {
    /// Domain the data is read from
    pub source_domain: Arc<dyn StorageDomain>,
    /// Root of the source subtree
    pub source_root: SyncPath,
    /// Domain the data is written into
    pub target_domain: Arc<dyn StorageDomain>,
    /// Root of the target subtree
    pub target_root: SyncPath,
    /// Transfer policy for this run
    pub policy: TransferPolicy,
    /// Cancellation token polled between operations
    pub cancel: CancellationToken,
    /// Request id carried through the logs
    pub request_id: uuid::Uuid,
}

impl SyncRequest {
    /// Create a request with the default policy and a fresh token
    pub fn new(
        source_domain: Arc<dyn StorageDomain>,
        source_root: SyncPath,
        target_domain: Arc<dyn StorageDomain>,
        target_root: SyncPath,
    ) -> Self {
        Self {
            source_domain,
            source_root,
            target_domain,
            target_root,
            policy: TransferPolicy::default(),
            cancel: CancellationToken::new(),
            request_id: uuid::Uuid::new_v4(),
        }
    }

    /// Set the transfer policy
    pub fn with_policy(mut self, policy: TransferPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Supply a caller-owned cancellation token
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// The reconciliation and transfer engine
#[derive(Debug, Default)]
pub struct SyncEngine;

impl SyncEngine {
    /// Create a new engine
    pub fn new() -> Self {
        Self
    }

    /// Make the target subtree consistent with the source subtree.
    ///
    /// Walks both trees, computes the operation list, and executes it (or
    /// only reports it, under a dry-run policy). Returns the change report;
    /// on a fatal abort the partial report travels inside the failure.
    pub async fn sync(&self, request: SyncRequest) -> std::result::Result<ChangeReport, SyncFailure> {
        let policy = &request.policy;
        info!(
            request_id = %request.request_id,
            "syncing {} ({}) -> {} ({})",
            request.source_root,
            request.source_domain.tag(),
            request.target_root,
            request.target_domain.tag(),
        );

        let empty_report = || ChangeReport::new(policy.dry_run);
        self.check_root(request.source_domain.as_ref(), &request.source_root)
            .await
            .map_err(|e| SyncFailure::new(e, empty_report()))?;
        self.check_root(request.target_domain.as_ref(), &request.target_root)
            .await
            .map_err(|e| SyncFailure::new(e, empty_report()))?;

        let options = WalkOptions {
            max_depth: policy.max_depth,
            compute_checksums: policy.verify_checksum,
        };
        let source_tree = walk_tree(
            request.source_domain.as_ref(),
            &request.source_root,
            options.clone(),
        )
        .await
        .map_err(|e| SyncFailure::new(e, empty_report()))?;
        let target_tree = walk_tree(
            request.target_domain.as_ref(),
            &request.target_root,
            options,
        )
        .await
        .map_err(|e| SyncFailure::new(e, empty_report()))?;

        let operations = compute_operations(&source_tree, &target_tree, policy)
            .map_err(|e| SyncFailure::new(e, empty_report()))?;

        let executor = TransferExecutor::new(
            request.source_domain.as_ref(),
            &request.source_root,
            request.target_domain.as_ref(),
            &request.target_root,
        );
        let report = executor
            .execute(&operations, policy, &request.cancel)
            .await?;

        info!(
            request_id = %request.request_id,
            "sync finished: {} container(s), {} cop{}, {} skip(s), {} failure(s)",
            report.containers_created.len(),
            report.copies.len(),
            if report.copies.len() == 1 { "y" } else { "ies" },
            report.skipped.len(),
            report.failures.len(),
        );
        Ok(report)
    }

    async fn check_root(
        &self,
        domain: &dyn StorageDomain,
        root: &SyncPath,
    ) -> tidesync_types::Result<()> {
        match domain.kind(root).await? {
            PathKind::Container => Ok(()),
            PathKind::Leaf => Err(Error::walk(root.to_string(), "root is not a container")),
            PathKind::Missing => Err(Error::walk(root.to_string(), "root does not exist")),
        }
    }
}

async fn walk_tree(
    domain: &dyn StorageDomain,
    root: &SyncPath,
    options: WalkOptions,
) -> tidesync_types::Result<crate::walk::TreeSnapshot> {
    TreeWalker::open(domain, root, options).await?.collect().await
}

//! Execution of an ordered operation list
//!
//! The executor walks the operation list in the order the diff engine emitted
//! it (parents before children), performing creations and copies against the
//! two domains and folding outcomes into the change report. Every completed
//! copy is verified by byte count and, when requested, by checksum; a copy
//! that fails verification is never reported as success, whatever the
//! ignore-error policy says.

use tidesync_domain::CHUNK_SIZE;
use tidesync_types::{
    ChangeReport, CopyRecord, Error, FailureRecord, Operation, Result, SkipRecord, StorageDomain,
    SyncFailure, SyncPath, TransferPolicy,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Executes diff operations between a source and a target domain
pub struct TransferExecutor<'a> {
    source: &'a dyn StorageDomain,
    source_root: &'a SyncPath,
    target: &'a dyn StorageDomain,
    target_root: &'a SyncPath,
}

impl<'a> TransferExecutor<'a> {
    /// Bind an executor to its two roots
    pub fn new(
        source: &'a dyn StorageDomain,
        source_root: &'a SyncPath,
        target: &'a dyn StorageDomain,
        target_root: &'a SyncPath,
    ) -> Self {
        Self {
            source,
            source_root,
            target,
            target_root,
        }
    }

    /// Run the operations under a policy and cancellation token.
    ///
    /// A fatal condition aborts the run and returns the partial report inside
    /// the failure; cancellation stops dispatching new operations and returns
    /// the partial report as a success with its `cancelled` flag set.
    pub async fn execute(
        &self,
        operations: &[Operation],
        policy: &TransferPolicy,
        cancel: &CancellationToken,
    ) -> std::result::Result<ChangeReport, SyncFailure> {
        let mut report = ChangeReport::new(policy.dry_run);

        for operation in operations {
            if cancel.is_cancelled() {
                info!("cancellation requested, stopping before {}", operation.rel());
                report.cancelled = true;
                break;
            }

            match operation {
                Operation::Skip { rel, reason } => {
                    report.skipped.push(SkipRecord {
                        rel: rel.clone(),
                        reason: reason.clone(),
                    });
                }
                Operation::CreateContainer { rel } => {
                    if policy.dry_run {
                        report.containers_created.push(rel.clone());
                        continue;
                    }
                    let target_path = self.target_root.join_rel(rel);
                    match self.target.create_container(&target_path).await {
                        Ok(()) => report.containers_created.push(rel.clone()),
                        Err(error) => {
                            report.failures.push(FailureRecord {
                                rel: rel.clone(),
                                cause: error.to_string(),
                            });
                            if error.is_fatal() || !policy.ignore_err {
                                return Err(SyncFailure::new(error, report));
                            }
                            warn!("continuing past failed container {rel}: {error}");
                        }
                    }
                }
                Operation::CopyLeaf { rel, expected_size } => {
                    let source_path = self.source_root.join_rel(rel);
                    let target_path = self.target_root.join_rel(rel);

                    if policy.dry_run {
                        report.copies.push(CopyRecord {
                            rel: rel.clone(),
                            source: source_path.to_string(),
                            target: target_path.to_string(),
                            bytes: *expected_size,
                        });
                        continue;
                    }

                    match self.target.kind(&target_path).await {
                        Ok(kind) if kind.exists() && !policy.overwrite => {
                            if policy.ignore_err {
                                warn!("target {target_path} exists, skipping");
                                report.skipped.push(SkipRecord {
                                    rel: rel.clone(),
                                    reason: "target exists and overwriting is disabled".to_owned(),
                                });
                                continue;
                            }
                            let error = Error::AlreadyExists {
                                path: target_path.to_string(),
                            };
                            report.failures.push(FailureRecord {
                                rel: rel.clone(),
                                cause: error.to_string(),
                            });
                            return Err(SyncFailure::new(error, report));
                        }
                        Ok(_) => {}
                        Err(error) => {
                            report.failures.push(FailureRecord {
                                rel: rel.clone(),
                                cause: error.to_string(),
                            });
                            if error.is_fatal() || !policy.ignore_err {
                                return Err(SyncFailure::new(error, report));
                            }
                            warn!("continuing past unprobeable target {target_path}: {error}");
                            continue;
                        }
                    }

                    match self
                        .copy_leaf(&source_path, &target_path, *expected_size, policy)
                        .await
                    {
                        Ok(bytes) => {
                            report.copies.push(CopyRecord {
                                rel: rel.clone(),
                                source: source_path.to_string(),
                                target: target_path.to_string(),
                                bytes,
                            });
                        }
                        Err(error) => {
                            report.failures.push(FailureRecord {
                                rel: rel.clone(),
                                cause: error.to_string(),
                            });
                            if error.is_fatal() || !policy.ignore_err {
                                return Err(SyncFailure::new(error, report));
                            }
                            warn!("continuing past failed copy {rel}: {error}");
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    /// Copy one leaf and verify the result.
    ///
    /// Post-condition: on success the target holds exactly the byte count the
    /// walk recorded, and the same checksum as the source when verification
    /// is requested.
    async fn copy_leaf(
        &self,
        source_path: &SyncPath,
        target_path: &SyncPath,
        expected_size: u64,
        policy: &TransferPolicy,
    ) -> Result<u64> {
        let mut reader = self.source.open_read(source_path).await?;
        let mut writer = self.target.open_write(target_path).await?;

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut bytes: u64 = 0;
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            writer.write_all(&buf[..n]).await?;
            bytes += n as u64;
        }
        writer.shutdown().await?;

        if bytes != expected_size {
            return Err(Error::integrity(
                target_path.to_string(),
                format!("transferred {bytes} byte(s), expected {expected_size}"),
            ));
        }
        let target_size = self.target.size(target_path).await?;
        if target_size != bytes {
            return Err(Error::integrity(
                target_path.to_string(),
                format!("target holds {target_size} byte(s) after writing {bytes}"),
            ));
        }
        if policy.verify_checksum {
            let source_checksum = self.source.checksum(source_path).await?;
            let target_checksum = self.target.checksum(target_path).await?;
            if source_checksum != target_checksum {
                return Err(Error::integrity(
                    target_path.to_string(),
                    format!("checksum {target_checksum} does not match source {source_checksum}"),
                ));
            }
        }

        debug!("copied {source_path} -> {target_path} ({bytes} bytes)");
        Ok(bytes)
    }
}

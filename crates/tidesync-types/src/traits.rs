//! The storage domain seam
//!
//! Both storage systems being reconciled sit behind [`StorageDomain`]: the
//! local filesystem and the remote object-and-collection store implement the
//! same capability set, so the walker, diff engine, and executor never branch
//! on which side of the network a path lives on.

use crate::{ChildEntry, DomainContext, DomainTag, PathKind, Result, SyncPath};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// A byte stream read from a domain
pub type DomainReader = Box<dyn AsyncRead + Send + Unpin>;

/// A byte stream written into a domain with create-or-truncate semantics
pub type DomainWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Capability set of one storage domain.
///
/// Probes perform exactly one round-trip and cache nothing; callers needing a
/// frozen snapshot capture the returned values themselves, which is what
/// [`crate::TreeEntry`] is for.
#[async_trait]
pub trait StorageDomain: Send + Sync {
    /// Which side of the reconciliation this domain is
    fn tag(&self) -> DomainTag;

    /// Home and current working location used to resolve `~` and `.`
    fn context(&self) -> DomainContext;

    /// Probe what, if anything, exists at a path
    async fn kind(&self, path: &SyncPath) -> Result<PathKind>;

    /// Whether anything exists at a path
    async fn exists(&self, path: &SyncPath) -> Result<bool> {
        Ok(self.kind(path).await?.exists())
    }

    /// List the direct children of a container
    async fn list_children(&self, path: &SyncPath) -> Result<Vec<ChildEntry>>;

    /// Size in bytes of a leaf
    async fn size(&self, path: &SyncPath) -> Result<u64>;

    /// Checksum of a leaf, rendered as `sha2:<hex>`
    async fn checksum(&self, path: &SyncPath) -> Result<String>;

    /// Create a container and any missing parents; succeeding when the
    /// container already exists (idempotent)
    async fn create_container(&self, path: &SyncPath) -> Result<()>;

    /// Open a leaf for reading
    async fn open_read(&self, path: &SyncPath) -> Result<DomainReader>;

    /// Open a leaf for writing, creating or truncating it
    async fn open_write(&self, path: &SyncPath) -> Result<DomainWriter>;

    /// Move a leaf or container to a new location in the same domain,
    /// creating missing parent containers. Returns the new path; the
    /// receiver keeps describing the old, now vacated, location.
    async fn rename(&self, path: &SyncPath, new_path: &SyncPath) -> Result<SyncPath>;

    /// Remove a leaf or container tree. Never called by the sync engine,
    /// which is non-destructive by contract; exposed for callers and tests.
    async fn remove(&self, path: &SyncPath) -> Result<()>;
}

//! Local filesystem domain

use crate::checksum::checksum_reader;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tidesync_types::{
    ChildEntry, DomainContext, DomainReader, DomainTag, DomainWriter, EntryKind, Error, PathKind,
    Result, StorageDomain, SyncPath,
};
use tokio::fs;
use tracing::debug;

/// [`StorageDomain`] backed by the local filesystem.
///
/// Paths map segment-for-segment onto native absolute paths. The home and
/// working locations handed to the constructor are only used to resolve `~`
/// and `.`; the domain itself is not rooted or sandboxed.
#[derive(Debug, Clone)]
pub struct LocalDomain {
    home: PathBuf,
    cwd: PathBuf,
}

impl LocalDomain {
    /// Create a domain whose home and working location are the same directory
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        let base = base.into();
        Self {
            home: base.clone(),
            cwd: base,
        }
    }

    /// Create a domain with distinct home and working locations
    pub fn with_locations<P: Into<PathBuf>>(home: P, cwd: P) -> Self {
        Self {
            home: home.into(),
            cwd: cwd.into(),
        }
    }

    /// Convert a native absolute path into a local [`SyncPath`]
    pub fn sync_path<P: AsRef<Path>>(path: P) -> Result<SyncPath> {
        let raw = path.as_ref().to_str().ok_or_else(|| {
            Error::invalid_path(format!(
                "local path is not valid UTF-8: {}",
                path.as_ref().display()
            ))
        })?;
        Ok(SyncPath::new(DomainTag::Local, [raw]))
    }

    fn fs_path(&self, path: &SyncPath) -> PathBuf {
        PathBuf::from(path.to_string())
    }
}

#[async_trait]
impl StorageDomain for LocalDomain {
    fn tag(&self) -> DomainTag {
        DomainTag::Local
    }

    fn context(&self) -> DomainContext {
        DomainContext::new(
            &self.home.to_string_lossy(),
            &self.cwd.to_string_lossy(),
        )
    }

    async fn kind(&self, path: &SyncPath) -> Result<PathKind> {
        match fs::metadata(self.fs_path(path)).await {
            Ok(meta) if meta.is_dir() => Ok(PathKind::Container),
            Ok(_) => Ok(PathKind::Leaf),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PathKind::Missing),
            Err(e) => Err(Error::Io {
                message: format!("failed to probe '{path}': {e}"),
            }),
        }
    }

    async fn list_children(&self, path: &SyncPath) -> Result<Vec<ChildEntry>> {
        let dir = self.fs_path(path);
        let mut entries = fs::read_dir(&dir).await.map_err(|e| Error::Io {
            message: format!("failed to list '{path}': {e}"),
        })?;

        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| Error::Io {
            message: format!("failed to read an entry of '{path}': {e}"),
        })? {
            let meta = entry.metadata().await.map_err(|e| Error::Io {
                message: format!(
                    "failed to read metadata of '{}': {e}",
                    entry.path().display()
                ),
            })?;
            let name = entry.file_name().to_str().map(str::to_owned).ok_or_else(|| {
                Error::invalid_path(format!(
                    "child name is not valid UTF-8 under '{path}'"
                ))
            })?;
            children.push(ChildEntry {
                name,
                kind: if meta.is_dir() {
                    EntryKind::Container
                } else {
                    EntryKind::Leaf
                },
                size: if meta.is_dir() { 0 } else { meta.len() },
                modified: meta.modified().ok(),
            });
        }
        Ok(children)
    }

    async fn size(&self, path: &SyncPath) -> Result<u64> {
        let meta = fs::metadata(self.fs_path(path)).await.map_err(|e| Error::Io {
            message: format!("failed to stat '{path}': {e}"),
        })?;
        Ok(meta.len())
    }

    async fn checksum(&self, path: &SyncPath) -> Result<String> {
        let file = fs::File::open(self.fs_path(path)).await.map_err(|e| Error::Io {
            message: format!("failed to open '{path}' for hashing: {e}"),
        })?;
        checksum_reader(file).await
    }

    async fn create_container(&self, path: &SyncPath) -> Result<()> {
        fs::create_dir_all(self.fs_path(path))
            .await
            .map_err(|e| Error::Io {
                message: format!("failed to create directory '{path}': {e}"),
            })?;
        debug!("created local directory {path}");
        Ok(())
    }

    async fn open_read(&self, path: &SyncPath) -> Result<DomainReader> {
        let file = fs::File::open(self.fs_path(path)).await.map_err(|e| Error::Io {
            message: format!("failed to open '{path}' for reading: {e}"),
        })?;
        Ok(Box::new(file))
    }

    async fn open_write(&self, path: &SyncPath) -> Result<DomainWriter> {
        let file = fs::File::create(self.fs_path(path))
            .await
            .map_err(|e| Error::Io {
                message: format!("failed to open '{path}' for writing: {e}"),
            })?;
        Ok(Box::new(file))
    }

    async fn rename(&self, path: &SyncPath, new_path: &SyncPath) -> Result<SyncPath> {
        if self.kind(path).await? == PathKind::Missing {
            return Err(Error::invalid_path(format!(
                "cannot rename '{path}': it does not exist"
            )));
        }
        let parent = new_path.parent();
        if !parent.is_root() {
            self.create_container(&parent).await?;
        }
        fs::rename(self.fs_path(path), self.fs_path(new_path))
            .await
            .map_err(|e| Error::Io {
                message: format!("failed to move '{path}' to '{new_path}': {e}"),
            })?;
        debug!("moved {path} -> {new_path}");
        Ok(new_path.clone())
    }

    async fn remove(&self, path: &SyncPath) -> Result<()> {
        let target = self.fs_path(path);
        match self.kind(path).await? {
            PathKind::Container => fs::remove_dir_all(&target).await.map_err(|e| Error::Io {
                message: format!("failed to remove directory '{path}': {e}"),
            }),
            PathKind::Leaf => fs::remove_file(&target).await.map_err(|e| Error::Io {
                message: format!("failed to remove file '{path}': {e}"),
            }),
            PathKind::Missing => Ok(()),
        }
    }
}

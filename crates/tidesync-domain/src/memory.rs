//! In-memory object-and-collection store
//!
//! A deterministic [`StorageDomain`] with the remote store's shape: a flat
//! catalog of collections and data objects addressed by absolute path, with
//! store-held checksums and no modification times. It serves as the reference
//! implementation of the remote contract and lets the engine be tested
//! end-to-end without a live endpoint. Fault-injection knobs simulate the
//! partial failures a real remote produces.

use crate::checksum::checksum_bytes;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tidesync_types::{
    ChildEntry, DomainContext, DomainReader, DomainTag, DomainWriter, EntryKind, Error, PathKind,
    Result, StorageDomain, SyncPath,
};
use tokio::io::AsyncWrite;
use tracing::debug;

#[derive(Debug, Clone)]
enum Node {
    Container,
    Leaf(Vec<u8>),
}

#[derive(Debug, Default)]
struct Store {
    nodes: HashMap<String, Node>,
    fail_list: HashSet<String>,
    fail_read: HashSet<String>,
    corrupt_on_write: HashSet<String>,
}

fn lock_store(store: &Mutex<Store>) -> MutexGuard<'_, Store> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

fn ancestor_keys(key: &str) -> Vec<String> {
    let mut keys = vec!["/".to_owned()];
    let mut acc = String::new();
    for segment in key.split('/').filter(|s| !s.is_empty()) {
        acc.push('/');
        acc.push_str(segment);
        keys.push(acc.clone());
    }
    keys
}

fn ensure_parents(store: &mut Store, key: &str) {
    for ancestor in ancestor_keys(key) {
        if ancestor != key {
            store.nodes.entry(ancestor).or_insert(Node::Container);
        }
    }
}

/// An in-memory remote domain
#[derive(Debug, Clone)]
pub struct MemoryDomain {
    store: Arc<Mutex<Store>>,
    home: String,
    cwd: String,
}

impl MemoryDomain {
    /// Create a store whose home collection (and its ancestors) exist
    pub fn new(home: &str) -> Self {
        let domain = Self {
            store: Arc::new(Mutex::new(Store::default())),
            home: home.to_owned(),
            cwd: home.to_owned(),
        };
        {
            let mut store = lock_store(&domain.store);
            ensure_parents(&mut store, home);
            store.nodes.insert(home.to_owned(), Node::Container);
        }
        domain
    }

    fn key(path: &SyncPath) -> String {
        path.to_string()
    }

    /// Insert a data object, creating missing parent collections
    pub fn put_leaf(&self, path: &SyncPath, bytes: &[u8]) {
        let key = Self::key(path);
        let mut store = lock_store(&self.store);
        ensure_parents(&mut store, &key);
        store.nodes.insert(key, Node::Leaf(bytes.to_vec()));
    }

    /// Insert an empty collection, creating missing parents
    pub fn put_container(&self, path: &SyncPath) {
        let key = Self::key(path);
        let mut store = lock_store(&self.store);
        ensure_parents(&mut store, &key);
        store.nodes.entry(key).or_insert(Node::Container);
    }

    /// Content of a data object, if one exists at the path
    pub fn leaf_content(&self, path: &SyncPath) -> Option<Vec<u8>> {
        match lock_store(&self.store).nodes.get(&Self::key(path)) {
            Some(Node::Leaf(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    /// Make future listings of this collection fail
    pub fn fail_listing(&self, path: &SyncPath) {
        lock_store(&self.store).fail_list.insert(Self::key(path));
    }

    /// Make future reads and checksum retrievals of this object fail
    pub fn fail_read(&self, path: &SyncPath) {
        lock_store(&self.store).fail_read.insert(Self::key(path));
    }

    /// Corrupt the next write to this path after the byte count is recorded,
    /// so post-copy checksum verification fails while sizes still match
    pub fn corrupt_on_write(&self, path: &SyncPath) {
        lock_store(&self.store)
            .corrupt_on_write
            .insert(Self::key(path));
    }
}

#[async_trait]
impl StorageDomain for MemoryDomain {
    fn tag(&self) -> DomainTag {
        DomainTag::Remote
    }

    fn context(&self) -> DomainContext {
        DomainContext::new(&self.home, &self.cwd)
    }

    async fn kind(&self, path: &SyncPath) -> Result<PathKind> {
        Ok(match lock_store(&self.store).nodes.get(&Self::key(path)) {
            Some(Node::Container) => PathKind::Container,
            Some(Node::Leaf(_)) => PathKind::Leaf,
            None => PathKind::Missing,
        })
    }

    async fn list_children(&self, path: &SyncPath) -> Result<Vec<ChildEntry>> {
        let key = Self::key(path);
        let store = lock_store(&self.store);
        if store.fail_list.contains(&key) {
            return Err(Error::remote(format!("listing '{path}' timed out")));
        }
        if !matches!(store.nodes.get(&key), Some(Node::Container)) {
            return Err(Error::remote(format!("'{path}' is not a collection")));
        }

        let prefix = if key == "/" { key.clone() } else { format!("{key}/") };
        let mut children: Vec<ChildEntry> = store
            .nodes
            .iter()
            .filter_map(|(k, node)| {
                let rest = k.strip_prefix(&prefix)?;
                if rest.is_empty() || rest.contains('/') {
                    return None;
                }
                Some(ChildEntry {
                    name: rest.to_owned(),
                    kind: match node {
                        Node::Container => EntryKind::Container,
                        Node::Leaf(_) => EntryKind::Leaf,
                    },
                    size: match node {
                        Node::Container => 0,
                        Node::Leaf(bytes) => bytes.len() as u64,
                    },
                    modified: None,
                })
            })
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    async fn size(&self, path: &SyncPath) -> Result<u64> {
        match lock_store(&self.store).nodes.get(&Self::key(path)) {
            Some(Node::Leaf(bytes)) => Ok(bytes.len() as u64),
            _ => Err(Error::remote(format!("'{path}' is not a data object"))),
        }
    }

    async fn checksum(&self, path: &SyncPath) -> Result<String> {
        let key = Self::key(path);
        let store = lock_store(&self.store);
        if store.fail_read.contains(&key) {
            return Err(Error::remote(format!("checksum of '{path}' unavailable")));
        }
        match store.nodes.get(&key) {
            Some(Node::Leaf(bytes)) => Ok(checksum_bytes(bytes)),
            _ => Err(Error::remote(format!("'{path}' is not a data object"))),
        }
    }

    async fn create_container(&self, path: &SyncPath) -> Result<()> {
        let key = Self::key(path);
        let mut store = lock_store(&self.store);
        if matches!(store.nodes.get(&key), Some(Node::Leaf(_))) {
            return Err(Error::remote(format!(
                "a data object already exists at '{path}'"
            )));
        }
        ensure_parents(&mut store, &key);
        store.nodes.insert(key, Node::Container);
        debug!("created collection {path}");
        Ok(())
    }

    async fn open_read(&self, path: &SyncPath) -> Result<DomainReader> {
        let key = Self::key(path);
        let store = lock_store(&self.store);
        if store.fail_read.contains(&key) {
            return Err(Error::remote(format!("reading '{path}' timed out")));
        }
        match store.nodes.get(&key) {
            Some(Node::Leaf(bytes)) => Ok(Box::new(Cursor::new(bytes.clone()))),
            _ => Err(Error::remote(format!("'{path}' is not a data object"))),
        }
    }

    async fn open_write(&self, path: &SyncPath) -> Result<DomainWriter> {
        Ok(Box::new(MemoryWriter {
            key: Self::key(path),
            store: Arc::clone(&self.store),
            buf: Vec::new(),
            committed: false,
        }))
    }

    async fn rename(&self, path: &SyncPath, new_path: &SyncPath) -> Result<SyncPath> {
        let old_key = Self::key(path);
        let new_key = Self::key(new_path);
        let mut store = lock_store(&self.store);

        let moved: Vec<(String, Node)> = store
            .nodes
            .iter()
            .filter(|(k, _)| **k == old_key || k.starts_with(&format!("{old_key}/")))
            .map(|(k, node)| {
                let suffix = &k[old_key.len()..];
                (format!("{new_key}{suffix}"), node.clone())
            })
            .collect();
        if moved.is_empty() {
            return Err(Error::invalid_path(format!(
                "cannot rename '{path}': it does not exist"
            )));
        }

        store
            .nodes
            .retain(|k, _| *k != old_key && !k.starts_with(&format!("{old_key}/")));
        ensure_parents(&mut store, &new_key);
        store.nodes.extend(moved);
        debug!("moved {path} -> {new_path}");
        Ok(new_path.clone())
    }

    async fn remove(&self, path: &SyncPath) -> Result<()> {
        let key = Self::key(path);
        let mut store = lock_store(&self.store);
        store
            .nodes
            .retain(|k, _| *k != key && !k.starts_with(&format!("{key}/")));
        Ok(())
    }
}

/// Create-or-truncate writer that commits into the store on shutdown
struct MemoryWriter {
    key: String,
    store: Arc<Mutex<Store>>,
    buf: Vec<u8>,
    committed: bool,
}

impl MemoryWriter {
    fn commit(&mut self) {
        if self.committed {
            return;
        }
        self.committed = true;
        let mut store = lock_store(&self.store);
        if store.corrupt_on_write.remove(&self.key) {
            if let Some(byte) = self.buf.first_mut() {
                *byte = byte.wrapping_add(1);
            }
        }
        ensure_parents(&mut store, &self.key);
        store
            .nodes
            .insert(self.key.clone(), Node::Leaf(std::mem::take(&mut self.buf)));
    }
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.buf.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<std::io::Result<()>> {
        self.commit();
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn domain() -> (MemoryDomain, SyncPath) {
        let domain = MemoryDomain::new("/zone/home/user");
        let home = SyncPath::new(DomainTag::Remote, ["/zone/home/user"]);
        (domain, home)
    }

    #[tokio::test]
    async fn test_put_and_probe() {
        let (domain, home) = domain();
        domain.put_leaf(&home.join(["a/x.txt"]), b"0123456789");

        assert_eq!(domain.kind(&home).await.unwrap(), PathKind::Container);
        assert_eq!(
            domain.kind(&home.join(["a"])).await.unwrap(),
            PathKind::Container
        );
        assert_eq!(
            domain.kind(&home.join(["a/x.txt"])).await.unwrap(),
            PathKind::Leaf
        );
        assert_eq!(domain.size(&home.join(["a/x.txt"])).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_list_children_sorted() {
        let (domain, home) = domain();
        domain.put_leaf(&home.join(["b.txt"]), b"b");
        domain.put_leaf(&home.join(["a.txt"]), b"a");
        domain.put_container(&home.join(["c"]));

        let names: Vec<String> = domain
            .list_children(&home)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["a.txt", "b.txt", "c"]);
    }

    #[tokio::test]
    async fn test_write_commits_on_shutdown() {
        let (domain, home) = domain();
        let path = home.join(["new/obj.dat"]);
        let mut writer = domain.open_write(&path).await.unwrap();
        writer.write_all(b"written bytes").await.unwrap();
        assert!(domain.leaf_content(&path).is_none());
        writer.shutdown().await.unwrap();

        assert_eq!(domain.leaf_content(&path).unwrap(), b"written bytes");

        let mut reader = domain.open_read(&path).await.unwrap();
        let mut read_back = Vec::new();
        reader.read_to_end(&mut read_back).await.unwrap();
        assert_eq!(read_back, b"written bytes");
    }

    #[tokio::test]
    async fn test_checksum_matches_helper() {
        let (domain, home) = domain();
        let path = home.join(["x.txt"]);
        domain.put_leaf(&path, b"payload");
        assert_eq!(
            domain.checksum(&path).await.unwrap(),
            checksum_bytes(b"payload")
        );
    }

    #[tokio::test]
    async fn test_create_container_idempotent_but_not_over_leaf() {
        let (domain, home) = domain();
        let coll = home.join(["sub"]);
        domain.create_container(&coll).await.unwrap();
        domain.create_container(&coll).await.unwrap();

        let leaf = home.join(["x.txt"]);
        domain.put_leaf(&leaf, b"x");
        assert!(domain.create_container(&leaf).await.is_err());
    }

    #[tokio::test]
    async fn test_rename_subtree() {
        let (domain, home) = domain();
        domain.put_leaf(&home.join(["old/x.txt"]), b"x");
        let old = home.join(["old"]);
        let new = home.join(["renamed"]);

        let moved = domain.rename(&old, &new).await.unwrap();
        assert_eq!(moved, new);
        assert_eq!(domain.kind(&old).await.unwrap(), PathKind::Missing);
        assert_eq!(
            domain.kind(&new.join(["x.txt"])).await.unwrap(),
            PathKind::Leaf
        );
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let (domain, home) = domain();
        let coll = home.join(["flaky"]);
        domain.put_leaf(&coll.join(["x.txt"]), b"x");
        domain.fail_listing(&coll);

        let err = domain.list_children(&coll).await.unwrap_err();
        assert!(matches!(err, Error::Remote { .. }));

        let obj = home.join(["unreadable.txt"]);
        domain.put_leaf(&obj, b"y");
        domain.fail_read(&obj);
        assert!(domain.open_read(&obj).await.is_err());
        assert!(domain.checksum(&obj).await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_on_write_flips_content() {
        let (domain, home) = domain();
        let path = home.join(["x.txt"]);
        domain.corrupt_on_write(&path);

        let mut writer = domain.open_write(&path).await.unwrap();
        writer.write_all(b"abc").await.unwrap();
        writer.shutdown().await.unwrap();

        let content = domain.leaf_content(&path).unwrap();
        assert_eq!(content.len(), 3);
        assert_ne!(content, b"abc");
    }
}

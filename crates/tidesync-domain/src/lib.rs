//! Storage domain implementations for tidesync
//!
//! This crate provides the two concrete [`tidesync_types::StorageDomain`]
//! implementations the engine is tested and shipped against:
//!
//! - [`LocalDomain`]: the local filesystem, mapping path segments onto native
//!   absolute paths
//! - [`MemoryDomain`]: an in-memory object-and-collection store with the
//!   remote contract's shape, used as the deterministic stand-in for a live
//!   remote endpoint
//!
//! plus the streaming SHA-256 [`checksum`] helper both rely on for transfer
//! verification.
//!
//! # Examples
//!
//! ```rust
//! use tidesync_domain::MemoryDomain;
//! use tidesync_types::{DomainTag, StorageDomain, SyncPath};
//!
//! # async fn example() -> tidesync_types::Result<()> {
//! let store = MemoryDomain::new("/zone/home/user");
//! let obj = SyncPath::new(DomainTag::Remote, ["/zone/home/user/x.txt"]);
//! store.put_leaf(&obj, b"content");
//! assert!(store.exists(&obj).await?);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod checksum;
pub mod local;
pub mod memory;

pub use checksum::{checksum_bytes, checksum_reader, CHECKSUM_PREFIX, CHUNK_SIZE};
pub use local::LocalDomain;
pub use memory::MemoryDomain;

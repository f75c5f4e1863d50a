//! Reconciliation and transfer engine for tidesync
//!
//! This crate hosts the core of the system: given a source root and a target
//! root in two (possibly different) storage domains, it
//!
//! - **walks** both subtrees lazily and depth-bounded ([`walk`]),
//! - **diffs** the two snapshots into the minimal ordered operation list
//!   ([`diff`]), and
//! - **executes** that list with integrity verification, overwrite control,
//!   and fault containment ([`executor`]),
//!
//! all stitched together by the [`SyncEngine`] entry point. The engine never
//! deletes anything at the target and is a pure function of the two tree
//! snapshots and the policy.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use tidesync_domain::MemoryDomain;
//! use tidesync_engine::{SyncEngine, SyncRequest};
//! use tidesync_types::{DomainTag, SyncPath, TransferPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(MemoryDomain::new("/zone/home/user"));
//! let target = Arc::new(MemoryDomain::new("/zone/home/user"));
//! let request = SyncRequest::new(
//!     source,
//!     SyncPath::new(DomainTag::Remote, ["/zone/home/user"]),
//!     target,
//!     SyncPath::new(DomainTag::Remote, ["/zone/home/user"]),
//! )
//! .with_policy(TransferPolicy::dry_run());
//! let report = SyncEngine::new().sync(request).await?;
//! println!("{} change(s) planned", report.copies.len());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod diff;
pub mod engine;
pub mod executor;
pub mod walk;

pub use diff::compute_operations;
pub use engine::{SyncEngine, SyncRequest};
pub use executor::TransferExecutor;
pub use walk::{TreeSnapshot, TreeWalker, WalkOptions};

//! Core type system and error handling for tidesync
//!
//! This crate provides the foundational types shared across the tidesync
//! workspace:
//!
//! - **Error handling**: the workspace error taxonomy, fatal/recoverable
//!   classification, and the abort wrapper that carries a partial report
//! - **Paths**: domain-tagged path values with pure join/relative arithmetic
//! - **Tree model**: walk entries with frozen size/fingerprint snapshots
//! - **Operations and reports**: the diff engine's output and the change
//!   report returned to callers
//! - **The domain seam**: the async [`StorageDomain`] capability trait both
//!   storage systems implement
//!
//! # Examples
//!
//! ```rust
//! use tidesync_types::{DomainContext, DomainTag, SyncPath, TransferPolicy};
//!
//! let ctx = DomainContext::new("/zone/home/user", "/zone/home/user");
//! let root = SyncPath::resolve(DomainTag::Remote, &ctx, ["~/data"]).unwrap();
//! assert_eq!(root.to_string(), "/zone/home/user/data");
//!
//! let policy = TransferPolicy::default().with_overwrite(true);
//! assert!(policy.verify_checksum);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod path;
pub mod policy;
pub mod report;
pub mod result;
pub mod traits;
pub mod tree;

pub use error::{Error, ErrorKind, SyncFailure};
pub use path::{DomainContext, DomainTag, RelPath, SyncPath};
pub use policy::TransferPolicy;
pub use report::{ChangeReport, CopyRecord, FailureRecord, Operation, SkipRecord};
pub use result::Result;
pub use traits::{DomainReader, DomainWriter, StorageDomain};
pub use tree::{ChildEntry, EntryKind, Fingerprint, PathKind, TreeEntry, WalkItem};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_and_report_defaults() {
        let report = ChangeReport::new(TransferPolicy::default().dry_run);
        assert!(!report.dry_run);
        assert!(report.is_noop());
    }

    #[test]
    fn test_error_fatal_surface() {
        assert!(Error::integrity("/a/x", "size mismatch").is_fatal());
        assert!(!Error::invalid_path("empty").is_fatal());
    }
}

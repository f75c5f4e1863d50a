//! Transfer policy configuration

use serde::{Deserialize, Serialize};

/// Immutable configuration for a synchronization run.
///
/// The four-way interaction of `overwrite` and `ignore_err` at a conflicting
/// leaf is spelled out on [`TransferPolicy::overwrite`] and applied by the
/// transfer executor; integrity failures ignore both knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPolicy {
    /// Replace leaves that already exist at the target. When false, a
    /// conflicting leaf is either a fatal error (`ignore_err` false) or a
    /// recorded skip (`ignore_err` true).
    pub overwrite: bool,
    /// Downgrade non-fatal per-operation errors to recorded failures and
    /// keep going instead of stopping on the first one
    pub ignore_err: bool,
    /// Maximum depth in segments below the roots; `None` is unlimited
    pub max_depth: Option<usize>,
    /// Create target containers even when they hold nothing
    pub copy_empty_containers: bool,
    /// Compute and report operations without executing any of them
    pub dry_run: bool,
    /// Compare and verify leaf content by checksum, not just size
    pub verify_checksum: bool,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            overwrite: false,
            ignore_err: false,
            max_depth: None,
            copy_empty_containers: false,
            dry_run: false,
            verify_checksum: true,
        }
    }
}

impl TransferPolicy {
    /// Policy for a reporting-only pass
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    /// Set the overwrite flag
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the ignore-error flag
    pub fn with_ignore_err(mut self, ignore_err: bool) -> Self {
        self.ignore_err = ignore_err;
        self
    }

    /// Bound the walk depth
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_strict() {
        let policy = TransferPolicy::default();
        assert!(!policy.overwrite);
        assert!(!policy.ignore_err);
        assert!(policy.max_depth.is_none());
        assert!(!policy.copy_empty_containers);
        assert!(!policy.dry_run);
        assert!(policy.verify_checksum);
    }

    #[test]
    fn test_builder_style() {
        let policy = TransferPolicy::dry_run()
            .with_overwrite(true)
            .with_max_depth(Some(2));
        assert!(policy.dry_run);
        assert!(policy.overwrite);
        assert_eq!(policy.max_depth, Some(2));
    }
}

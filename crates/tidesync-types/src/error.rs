//! Error types and handling for tidesync
//!
//! All fallible operations in the workspace return [`crate::Result`], built on
//! the [`Error`] enum below. The executor classifies errors through [`Error::kind`]
//! and [`Error::is_fatal`] when applying its overwrite/ignore policy: fatal
//! errors always propagate, everything else is subject to the policy matrix.

use crate::report::ChangeReport;

/// Main error type for tidesync operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Path is malformed or cannot be resolved against its domain context
    #[error("invalid path: {message}")]
    InvalidPath {
        /// Description of what made the path unresolvable
        message: String,
    },

    /// A walk root does not exist or is not a container
    #[error("cannot walk '{path}': {message}")]
    Walk {
        /// String form of the root that failed
        path: String,
        /// Description of the failure
        message: String,
    },

    /// The diff engine observed something two deterministic walks can never
    /// produce, e.g. a duplicate relative path. Indicates a walker bug.
    #[error("diff invariant violated: {message}")]
    DiffInvariant {
        /// Description of the violated invariant
        message: String,
    },

    /// Transfer target already exists and overwriting is disallowed
    #[error("target already exists: {path}")]
    AlreadyExists {
        /// String form of the conflicting target
        path: String,
    },

    /// Post-copy verification found a size or checksum mismatch
    #[error("integrity check failed for '{path}': {message}")]
    Integrity {
        /// String form of the copied leaf
        path: String,
        /// Which verification failed and how
        message: String,
    },

    /// I/O operation against the local filesystem failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the underlying I/O call
        message: String,
    },

    /// The remote domain collaborator reported a failure
    #[error("remote error: {message}")]
    Remote {
        /// Error message from the remote collaborator
        message: String,
    },

    /// A path's segments do not start with the claimed ancestor
    #[error("'{path}' is not inside '{ancestor}'")]
    NotAnAncestor {
        /// String form of the path being relativized
        path: String,
        /// String form of the claimed ancestor
        ancestor: String,
    },

    /// Operation cancelled through the caller-supplied token
    #[error("operation cancelled")]
    Cancelled,
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Path resolution errors
    InvalidPath,
    /// Walk root errors
    Walk,
    /// Diff engine invariant violations
    DiffInvariant,
    /// Overwrite conflicts
    AlreadyExists,
    /// Verification mismatches
    Integrity,
    /// Local I/O errors
    Io,
    /// Remote collaborator errors
    Remote,
    /// Cancellation
    Cancelled,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPath { .. } | Self::NotAnAncestor { .. } => ErrorKind::InvalidPath,
            Self::Walk { .. } => ErrorKind::Walk,
            Self::DiffInvariant { .. } => ErrorKind::DiffInvariant,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::Io { .. } => ErrorKind::Io,
            Self::Remote { .. } => ErrorKind::Remote,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether this error must propagate regardless of the ignore-error policy.
    ///
    /// Invariant violations signal a walker bug and integrity failures would
    /// report a corrupted copy as success, so neither is ever downgraded to a
    /// recorded warning.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DiffInvariant { .. } | Self::Integrity { .. })
    }

    /// Create a new invalid-path error
    pub fn invalid_path<S: Into<String>>(message: S) -> Self {
        Self::InvalidPath {
            message: message.into(),
        }
    }

    /// Create a new walk error
    pub fn walk<P: Into<String>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Walk {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new diff-invariant error
    pub fn diff_invariant<S: Into<String>>(message: S) -> Self {
        Self::DiffInvariant {
            message: message.into(),
        }
    }

    /// Create a new integrity error
    pub fn integrity<P: Into<String>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Integrity {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new remote error
    pub fn remote<S: Into<String>>(message: S) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}

/// A fatal synchronization abort, carrying the partial [`ChangeReport`].
///
/// When the executor stops on a fatal condition the operations completed
/// before the failure are still observable through [`SyncFailure::report`],
/// so callers never have to guess how far the run got.
#[derive(thiserror::Error, Debug)]
#[error("synchronization aborted: {error}")]
pub struct SyncFailure {
    /// The error that aborted the run
    #[source]
    pub error: Error,
    /// Everything that completed (or was recorded) before the abort
    pub report: ChangeReport,
}

impl SyncFailure {
    /// Wrap an error together with the partial report accumulated so far
    pub fn new(error: Error, report: ChangeReport) -> Self {
        Self { error, report }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            Error::invalid_path("empty").kind(),
            ErrorKind::InvalidPath
        );
        assert_eq!(Error::walk("/a", "missing").kind(), ErrorKind::Walk);
        assert_eq!(
            Error::diff_invariant("dup").kind(),
            ErrorKind::DiffInvariant
        );
        assert_eq!(
            Error::AlreadyExists { path: "/a".into() }.kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            Error::integrity("/a", "size").kind(),
            ErrorKind::Integrity
        );
        assert_eq!(Error::remote("timeout").kind(), ErrorKind::Remote);
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::diff_invariant("dup").is_fatal());
        assert!(Error::integrity("/a", "checksum").is_fatal());
        assert!(!Error::AlreadyExists { path: "/a".into() }.is_fatal());
        assert!(!Error::remote("timeout").is_fatal());
        assert!(!Error::Cancelled.is_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error = Error::from(io_error);

        assert_eq!(error.kind(), ErrorKind::Io);
        assert!(error.to_string().contains("gone"));
    }

    #[test]
    fn test_sync_failure_carries_report() {
        let failure = SyncFailure::new(
            Error::AlreadyExists { path: "/a/x".into() },
            ChangeReport::new(false),
        );

        assert_eq!(failure.report.copies.len(), 0);
        assert!(failure.to_string().contains("already exists"));
    }
}

//! Result type alias for tidesync operations

/// Result type used throughout the tidesync workspace
pub type Result<T> = std::result::Result<T, crate::Error>;

//! Error types for the metadata store

use crate::path::{MetaPath, PathError};

/// Errors raised by metadata store operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetadataError {
    /// Requested parameter index exceeds the recorded parameter count
    #[error("parameter index {index} out of range for '{method}': {count} parameter(s) recorded")]
    ParameterOutOfRange {
        /// Method whose signature was consulted
        method: String,
        /// Index that was requested
        index: usize,
        /// Number of recorded parameters
        count: usize,
    },

    /// Library name registered twice
    #[error("library '{name}' is already registered (version {existing})")]
    DuplicateRegistration {
        /// Library name
        name: String,
        /// Version recorded by the first registration
        existing: String,
    },

    /// A path segment walked through a non-object value
    #[error("cannot write through '{path}': '{blocked_at}' is not an object")]
    NotAContainer {
        /// Path being written
        path: MetaPath,
        /// Prefix holding a non-object value
        blocked_at: MetaPath,
    },

    /// Malformed path
    #[error("invalid path: {0}")]
    Path(#[from] PathError),
}

impl MetadataError {
    /// Whether this is the out-of-range parameter lookup error
    #[inline]
    #[must_use]
    pub fn is_range_error(&self) -> bool {
        matches!(self, Self::ParameterOutOfRange { .. })
    }
}

/// Result alias for metadata operations
pub type MetadataResult<T> = Result<T, MetadataError>;

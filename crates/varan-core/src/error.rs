//! Umbrella error type for the Varan runtime

use varan_metadata::MetadataError;
use varan_registry::{AnnotationError, ConfigurationError};

/// Errors surfaced by the façade
#[derive(Debug, thiserror::Error)]
pub enum VaranError {
    /// Builder misuse
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Dispatch or behavior failure
    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    /// Metadata store rejection (range, duplicate library, bad path)
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Configuration document could not be parsed
    #[error("invalid configuration document: {0}")]
    ConfigFile(#[from] toml::de::Error),

    /// Log filter directive could not be parsed
    #[error("invalid log filter '{filter}': {message}")]
    LogFilter {
        /// Offending directive
        filter: String,
        /// Parser message
        message: String,
    },
}

/// Result alias for the façade
pub type VaranResult<T> = Result<T, VaranError>;

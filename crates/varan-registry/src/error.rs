//! Error types for the annotation registry
//!
//! - [`ConfigurationError`]: builder/table misuse, raised at the offending call
//! - [`ApplicationError`]: a composed entry could not produce a behavior
//! - [`AnnotationError`]: what behaviors and dispatch return

use crate::key::AnnotationKey;
use varan_metadata::{MetadataError, Variant};

/// Registry configuration mistakes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// `define`/`extend` called before a key was bound
    #[error("no annotation key bound: call for_key() before define() or extend()")]
    MissingKey,

    /// `extend` targeted the default variant
    #[error("cannot extend the default variant of '{key}'; use define() instead")]
    ExtendDefaultVariant {
        /// Key being extended
        key: AnnotationKey,
    },

    /// More than one parameterized entry in a single call
    #[error("only one parameterized entry allowed per call for '{key}'/'{variant}', got {count}")]
    MultipleParameterized {
        /// Key being configured
        key: AnnotationKey,
        /// Variant being configured
        variant: Variant,
        /// Parameterized entries supplied
        count: usize,
    },

    /// Non-default variant defined with no entries and no earlier base set
    #[error("variant '{variant}' of '{key}' defined with no entries and no prior base set")]
    EmptyVariant {
        /// Key being configured
        key: AnnotationKey,
        /// Variant being configured
        variant: Variant,
    },
}

/// A composed entry could not be turned into a callable behavior
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    /// Factory produced something other than a direct behavior
    #[error("entry #{position} ('{label}') of '{key}'/'{variant}' did not resolve to a callable behavior")]
    UnresolvedEntry {
        /// Key being dispatched
        key: AnnotationKey,
        /// Variant being dispatched
        variant: Variant,
        /// Position in the composed list
        position: usize,
        /// Entry label
        label: String,
    },

    /// Factory failed while building its behavior
    #[error("factory '{label}' of '{key}'/'{variant}' failed: {source}")]
    FactoryFailed {
        /// Key being dispatched
        key: AnnotationKey,
        /// Variant being dispatched
        variant: Variant,
        /// Factory label
        label: String,
        /// Underlying failure
        #[source]
        source: Box<AnnotationError>,
    },
}

/// Errors surfaced by dispatch and by behaviors
#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    /// Configuration mistake
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Entry could not be applied
    #[error("application error: {0}")]
    Application(#[from] ApplicationError),

    /// Metadata store rejected an operation
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Behavior-specific failure
    #[error("behavior '{behavior}' failed: {message}")]
    Behavior {
        /// Behavior label
        behavior: String,
        /// Failure description
        message: String,
    },
}

impl AnnotationError {
    /// Create behavior failure
    pub fn behavior(behavior: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Behavior {
            behavior: behavior.into(),
            message: message.into(),
        }
    }

    /// Check if this is a configuration error
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is an application error
    #[inline]
    #[must_use]
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application(_))
    }
}

/// Result alias for dispatch
pub type AnnotationResult<T> = Result<T, AnnotationError>;

//! Annotation keys

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier grouping all variants of one behavior family
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnnotationKey(String);

impl AnnotationKey {
    /// Create key from name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Key name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnnotationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnnotationKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for AnnotationKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}

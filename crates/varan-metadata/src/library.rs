//! Library self-registration guard

use crate::error::{MetadataError, MetadataResult};
use indexmap::IndexMap;

/// Names and versions of libraries that registered themselves at load time
#[derive(Debug, Default, Clone)]
pub struct LibraryRegistry {
    libraries: IndexMap<String, String>,
}

impl LibraryRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` at `version`
    ///
    /// # Errors
    /// Returns [`MetadataError::DuplicateRegistration`] if `name` is already present,
    /// whatever version either registration carries.
    pub fn register(&mut self, name: &str, version: &str) -> MetadataResult<()> {
        if let Some(existing) = self.libraries.get(name) {
            return Err(MetadataError::DuplicateRegistration {
                name: name.to_string(),
                existing: existing.clone(),
            });
        }
        self.libraries.insert(name.to_string(), version.to_string());
        Ok(())
    }

    /// Version recorded for `name`
    #[inline]
    #[must_use]
    pub fn version_of(&self, name: &str) -> Option<&str> {
        self.libraries.get(name).map(String::as_str)
    }

    /// All registrations in load order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.libraries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of registered libraries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    /// Check if nothing registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

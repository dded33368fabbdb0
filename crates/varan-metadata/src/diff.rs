//! Captured metadata changes
//!
//! A [`MetadataDiff`] remembers, for each (target, path) written while a
//! capture was active, the value that was there before the first write.
//! Reverting walks the record backwards and restores those values.

use crate::path::MetaPath;
use crate::target::Target;
use serde_json::Value;

/// One recorded change
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    /// Target whose bucket was written
    pub target: Target,

    /// Path that was written
    pub path: MetaPath,

    /// Value before the first captured write; `None` when the path did not exist
    pub previous: Option<Value>,
}

/// Ordered record of first writes during a capture
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataDiff {
    entries: Vec<DiffEntry>,
}

impl MetadataDiff {
    /// Create empty diff
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a write; only the first write per (target, path) is kept
    pub fn record(&mut self, target: &Target, path: &MetaPath, previous: Option<Value>) {
        let seen = self
            .entries
            .iter()
            .any(|e| e.target == *target && e.path == *path);
        if !seen {
            self.entries.push(DiffEntry {
                target: target.clone(),
                path: path.clone(),
                previous,
            });
        }
    }

    /// Fold another diff in; entries already known keep their older value
    pub fn absorb(&mut self, other: MetadataDiff) {
        for entry in other.entries {
            self.record(&entry.target, &entry.path, entry.previous);
        }
    }

    /// Recorded entries in write order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[DiffEntry] {
        &self.entries
    }

    /// Number of recorded paths
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths touched for `target`
    pub fn paths_for<'a>(&'a self, target: &'a Target) -> impl Iterator<Item = &'a MetaPath> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.target == *target)
            .map(|e| &e.path)
    }
}

//! Variant names and the variant registry
//!
//! The registry maps each variant to the ordered set of targets currently
//! assigned to it. Reassignment moves a target between buckets.

use crate::target::TargetId;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Named alternative implementation set
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Variant(String);

impl Variant {
    /// Name of the distinguished variant that always exists
    pub const DEFAULT_NAME: &'static str = "default";

    /// Create variant from name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Variant name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the `default` variant
    #[inline]
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT_NAME
    }
}

impl Default for Variant {
    fn default() -> Self {
        Self(Self::DEFAULT_NAME.to_string())
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Variant {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Variant {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Variant → assigned targets
#[derive(Debug, Default, Clone)]
pub struct VariantRegistry {
    buckets: IndexMap<Variant, IndexSet<TargetId>>,
    assigned: HashMap<TargetId, Variant>,
}

impl VariantRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `target` into `variant`'s bucket
    ///
    /// Returns the variant the target was previously recorded under
    /// (`default` when it had none).
    pub fn assign(&mut self, target: TargetId, variant: Variant) -> Variant {
        let previous = self.assigned.get(&target).cloned().unwrap_or_default();
        if let Some(bucket) = self.buckets.get_mut(&previous) {
            bucket.shift_remove(&target);
        }
        self.buckets
            .entry(variant.clone())
            .or_default()
            .insert(target);
        self.assigned.insert(target, variant);
        previous
    }

    /// Variant last assigned to `target`
    #[inline]
    #[must_use]
    pub fn variant_of(&self, target: TargetId) -> Option<&Variant> {
        self.assigned.get(&target)
    }

    /// Targets currently assigned to `variant`, in assignment order
    #[must_use]
    pub fn members_of(&self, variant: &Variant) -> Vec<TargetId> {
        self.buckets
            .get(variant)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Variants that have held at least one target
    pub fn variants(&self) -> impl Iterator<Item = &Variant> {
        self.buckets.keys()
    }
}

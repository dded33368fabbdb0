//! Registry table and dispatch
//!
//! [`RegistryTable`] maps `(key, variant)` to a [`RegistryEntry`] holding a
//! replaceable base set and an additive extension set. [`RegistryTable::dispatch`]
//! composes `base ++ extension` for a resolved variant and threads the target
//! (owner level) or descriptor (member level) through every behavior in order.

use crate::entry::{check_entries, push_unique, Entry, Replacement};
use crate::error::{AnnotationResult, ConfigurationError};
use crate::key::AnnotationKey;
use crate::site::{AttachSite, Attached, Invocation, TypeOracle};
use indexmap::IndexMap;
use parking_lot::RwLock;
use smallvec::SmallVec;
use varan_metadata::{MetadataStore, Variant};

/// Composed behavior list for one dispatch
pub type Composed = SmallVec<[Entry; 4]>;

/// Behavior sets for one `(key, variant)`
#[derive(Debug, Clone, Default)]
pub struct RegistryEntry {
    /// Replaced wholesale by each `define`
    pub base: Vec<Entry>,
    /// Grows with each `extend`, never cleared by `define`
    pub extension: Vec<Entry>,
}

/// Keyed, variant-aware behavior table
#[derive(Debug, Default)]
pub struct RegistryTable {
    entries: RwLock<IndexMap<AnnotationKey, IndexMap<Variant, RegistryEntry>>>,
}

impl RegistryTable {
    /// Create empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the base set of `(key, variant)`
    ///
    /// # Errors
    /// - [`ConfigurationError::MultipleParameterized`] if more than one factory entry is given
    /// - [`ConfigurationError::EmptyVariant`] if a non-default variant gets no
    ///   entries and has no earlier base set
    pub fn define(
        &self,
        key: &AnnotationKey,
        variant: &Variant,
        entries: Vec<Entry>,
    ) -> Result<(), ConfigurationError> {
        check_entries(key, variant, &entries)?;

        let mut table = self.entries.write();
        if entries.is_empty() && !variant.is_default() {
            let has_base = table
                .get(key)
                .and_then(|variants| variants.get(variant))
                .is_some_and(|slot| !slot.base.is_empty());
            if !has_base {
                return Err(ConfigurationError::EmptyVariant {
                    key: key.clone(),
                    variant: variant.clone(),
                });
            }
        }

        let slot = table
            .entry(key.clone())
            .or_default()
            .entry(variant.clone())
            .or_default();

        let mut base = Vec::with_capacity(entries.len());
        push_unique(&mut base, entries);
        tracing::debug!(key = %key, variant = %variant, count = base.len(), "base set defined");
        slot.base = base;
        Ok(())
    }

    /// Append to the extension set of `(key, variant)`
    ///
    /// # Errors
    /// - [`ConfigurationError::ExtendDefaultVariant`] for the default variant
    /// - [`ConfigurationError::MultipleParameterized`] if more than one factory entry is given
    pub fn extend(
        &self,
        key: &AnnotationKey,
        variant: &Variant,
        entries: Vec<Entry>,
    ) -> Result<(), ConfigurationError> {
        if variant.is_default() {
            return Err(ConfigurationError::ExtendDefaultVariant { key: key.clone() });
        }
        check_entries(key, variant, &entries)?;

        let mut table = self.entries.write();
        let slot = table
            .entry(key.clone())
            .or_default()
            .entry(variant.clone())
            .or_default();
        push_unique(&mut slot.extension, entries);
        tracing::debug!(
            key = %key,
            variant = %variant,
            count = slot.extension.len(),
            "extension set grown"
        );
        Ok(())
    }

    /// Composed `base ++ extension` list for `variant`
    ///
    /// The base set falls back to the default variant's when the variant's own
    /// is empty. The extension set comes from the variant's bucket when it
    /// exists, otherwise from the default's.
    #[must_use]
    pub fn compose(&self, key: &AnnotationKey, variant: &Variant) -> Composed {
        let table = self.entries.read();
        let Some(variants) = table.get(key) else {
            return Composed::new();
        };

        let own = variants.get(variant);
        let default = variants.get(&Variant::default());

        let base = match own {
            Some(slot) if !slot.base.is_empty() => &slot.base[..],
            _ => default.map_or(&[][..], |slot| &slot.base[..]),
        };
        let extension = own.or(default).map_or(&[][..], |slot| &slot.extension[..]);

        base.iter().chain(extension).cloned().collect()
    }

    /// Run the composed behaviors for `variant` against `invocation`
    ///
    /// Owner-level behaviors may hand back a replacement target, member-level
    /// behaviors a replacement descriptor; each feeds the next behavior.
    ///
    /// # Errors
    /// Returns the first error raised by an entry or behavior
    pub fn dispatch(
        &self,
        store: &MetadataStore,
        oracle: Option<&dyn TypeOracle>,
        key: &AnnotationKey,
        variant: &Variant,
        invocation: Invocation,
    ) -> AnnotationResult<Attached> {
        // Cloned out so behaviors may re-enter the table.
        let composed = self.compose(key, variant);
        let Invocation {
            mut target,
            member,
            mut descriptor,
        } = invocation;

        tracing::debug!(
            key = %key,
            variant = %variant,
            target = %target,
            member = member.as_deref().unwrap_or("-"),
            behaviors = composed.len(),
            "dispatching"
        );

        for (position, entry) in composed.iter().enumerate() {
            let behavior = entry.materialize(key, variant, position)?;
            let site = AttachSite {
                store,
                oracle,
                key,
                variant,
                target: target.clone(),
                member: member.as_deref(),
                descriptor: descriptor.clone(),
            };

            match (behavior.apply(&site)?, member.is_some()) {
                (None, _) => {}
                (Some(Replacement::Target(next)), false) => target = next,
                (Some(Replacement::Descriptor(next)), true) => descriptor = Some(next),
                (Some(ignored), _) => {
                    tracing::trace!(
                        behavior = behavior.label(),
                        ?ignored,
                        "replacement does not match attachment level"
                    );
                }
            }
        }

        Ok(Attached { target, descriptor })
    }

    /// Check if `key` has any registration
    #[must_use]
    pub fn contains(&self, key: &AnnotationKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Registered keys in registration order
    #[must_use]
    pub fn keys(&self) -> Vec<AnnotationKey> {
        self.entries.read().keys().cloned().collect()
    }

    /// Variants registered under `key`
    #[must_use]
    pub fn variants(&self, key: &AnnotationKey) -> Vec<Variant> {
        self.entries
            .read()
            .get(key)
            .map(|variants| variants.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of one `(key, variant)` slot
    #[must_use]
    pub fn entry(&self, key: &AnnotationKey, variant: &Variant) -> Option<RegistryEntry> {
        self.entries.read().get(key)?.get(variant).cloned()
    }

    /// Number of registered keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

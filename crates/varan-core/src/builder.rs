//! Fluent registration façade
//!
//! ```rust
//! use varan_core::{Annotations, Entry};
//!
//! let annotations = Annotations::default();
//! let dispatcher = annotations
//!     .for_key("entity")
//!     .define(vec![Entry::from_fn("mark", |site| {
//!         site.write("entity", true)?;
//!         Ok(None)
//!     })])
//!     .unwrap()
//!     .apply()
//!     .unwrap();
//! assert_eq!(dispatcher.key().as_str(), "entity");
//! ```
//!
//! Every `define`/`extend` is checked when it is called. Nothing reaches the
//! registry table until [`AnnotationBuilder::apply`].

use crate::annotations::Runtime;
use crate::dispatcher::Dispatcher;
use std::sync::Arc;
use varan_metadata::Variant;
use varan_registry::{check_entries, AnnotationKey, ConfigurationError, Entry};

#[derive(Debug)]
enum Staged {
    Define(Variant, Vec<Entry>),
    Extend(Variant, Vec<Entry>),
}

/// Staged registrations for one key
pub struct AnnotationBuilder {
    runtime: Arc<Runtime>,
    key: Option<AnnotationKey>,
    variant: Variant,
    staged: Vec<Staged>,
}

impl AnnotationBuilder {
    pub(crate) fn new(runtime: Arc<Runtime>) -> Self {
        Self {
            runtime,
            key: None,
            variant: Variant::default(),
            staged: Vec::new(),
        }
    }

    /// Bind the annotation key
    #[must_use]
    pub fn for_key(mut self, key: impl Into<AnnotationKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Variant targeted by the following `define`/`extend` calls
    #[must_use]
    pub fn variant(mut self, variant: impl Into<Variant>) -> Self {
        self.variant = variant.into();
        self
    }

    /// Stage a base-set replacement for the current variant
    ///
    /// # Errors
    /// - [`ConfigurationError::MissingKey`] before [`Self::for_key`]
    /// - [`ConfigurationError::MultipleParameterized`] for more than one factory entry
    /// - [`ConfigurationError::EmptyVariant`] for an empty non-default variant with no base
    pub fn define(
        mut self,
        entries: impl IntoIterator<Item = Entry>,
    ) -> Result<Self, ConfigurationError> {
        let key = self.key.clone().ok_or(ConfigurationError::MissingKey)?;
        let entries: Vec<Entry> = entries.into_iter().collect();
        check_entries(&key, &self.variant, &entries)?;

        if entries.is_empty() && !self.variant.is_default() && !self.has_base(&key) {
            return Err(ConfigurationError::EmptyVariant {
                key,
                variant: self.variant,
            });
        }

        self.staged.push(Staged::Define(self.variant.clone(), entries));
        Ok(self)
    }

    /// Stage extension entries for the current variant
    ///
    /// # Errors
    /// - [`ConfigurationError::MissingKey`] before [`Self::for_key`]
    /// - [`ConfigurationError::ExtendDefaultVariant`] for the default variant
    /// - [`ConfigurationError::MultipleParameterized`] for more than one factory entry
    pub fn extend(
        mut self,
        entries: impl IntoIterator<Item = Entry>,
    ) -> Result<Self, ConfigurationError> {
        let key = self.key.clone().ok_or(ConfigurationError::MissingKey)?;
        if self.variant.is_default() {
            return Err(ConfigurationError::ExtendDefaultVariant { key });
        }
        let entries: Vec<Entry> = entries.into_iter().collect();
        check_entries(&key, &self.variant, &entries)?;

        self.staged.push(Staged::Extend(self.variant.clone(), entries));
        Ok(self)
    }

    /// Commit staged registrations and return the key's dispatcher
    ///
    /// # Errors
    /// Returns [`ConfigurationError::MissingKey`] before [`Self::for_key`], or
    /// the table's rejection of a staged registration
    pub fn apply(self) -> Result<Dispatcher, ConfigurationError> {
        let key = self.key.ok_or(ConfigurationError::MissingKey)?;
        let table = &self.runtime.table;

        for staged in self.staged {
            match staged {
                Staged::Define(variant, entries) => table.define(&key, &variant, entries)?,
                Staged::Extend(variant, entries) => table.extend(&key, &variant, entries)?,
            }
        }

        tracing::debug!(key = %key, "annotation applied");
        Ok(Dispatcher::new(key, self.runtime))
    }

    fn has_base(&self, key: &AnnotationKey) -> bool {
        let staged = self.staged.iter().rev().find_map(|staged| match staged {
            Staged::Define(variant, entries) if *variant == self.variant => Some(!entries.is_empty()),
            _ => None,
        });
        staged.unwrap_or_else(|| {
            self.runtime
                .table
                .entry(key, &self.variant)
                .is_some_and(|slot| !slot.base.is_empty())
        })
    }
}

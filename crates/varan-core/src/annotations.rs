//! Annotation runtime context
//!
//! [`Annotations`] owns one registry table, one resolver slot, one metadata
//! store and one scheduler. Independent contexts share nothing, so tests and
//! separate consumers never see each other's registrations.

use crate::builder::AnnotationBuilder;
use crate::config::AnnotationsConfig;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use varan_metadata::{MetadataResult, MetadataStore, StoreConfig, Target, Variant};
use varan_registry::{AnnotationKey, RegistryTable, ResolverSlot, TypeOracle};
use varan_scheduler::{DeferredScheduler, ReplayReport};

pub(crate) struct Runtime {
    pub(crate) config: AnnotationsConfig,
    pub(crate) table: Arc<RegistryTable>,
    pub(crate) resolver: Arc<ResolverSlot>,
    pub(crate) store: Arc<MetadataStore>,
    pub(crate) scheduler: Arc<DeferredScheduler>,
    pub(crate) oracle: RwLock<Option<Arc<dyn TypeOracle>>>,
}

impl Runtime {
    pub(crate) fn oracle(&self) -> Option<Arc<dyn TypeOracle>> {
        self.oracle.read().clone()
    }
}

/// Handle to an annotation runtime; clones share the same state
#[derive(Clone)]
pub struct Annotations {
    runtime: Arc<Runtime>,
}

impl Annotations {
    /// Create runtime from configuration
    #[must_use]
    pub fn new(config: AnnotationsConfig) -> Self {
        let store = Arc::new(MetadataStore::new(
            StoreConfig::default().with_mirror(config.mirror_metadata),
        ));
        let resolver = Arc::new(ResolverSlot::new());
        let scheduler =
            DeferredScheduler::new(Arc::clone(&store), Arc::clone(&resolver), config.eager_resolution);

        tracing::debug!(?config, "annotation runtime created");
        Self {
            runtime: Arc::new(Runtime {
                config,
                table: Arc::new(RegistryTable::new()),
                resolver,
                store,
                scheduler,
                oracle: RwLock::new(None),
            }),
        }
    }

    /// With a declared-type oracle visible to every behavior
    #[must_use]
    pub fn with_oracle(self, oracle: impl TypeOracle + 'static) -> Self {
        self.set_oracle(oracle);
        self
    }

    /// Replace the declared-type oracle
    pub fn set_oracle(&self, oracle: impl TypeOracle + 'static) {
        *self.runtime.oracle.write() = Some(Arc::new(oracle));
    }

    /// Start configuring annotations
    #[must_use]
    pub fn builder(&self) -> AnnotationBuilder {
        AnnotationBuilder::new(Arc::clone(&self.runtime))
    }

    /// Shorthand for `builder().for_key(key)`
    #[must_use]
    pub fn for_key(&self, key: impl Into<AnnotationKey>) -> AnnotationBuilder {
        self.builder().for_key(key)
    }

    /// Install the global variant resolver
    pub fn set_resolver<F>(&self, resolver: F)
    where
        F: Fn(&Target) -> Variant + Send + Sync + 'static,
    {
        self.runtime.resolver.install(resolver);
    }

    /// Return to the always-default resolver
    pub fn reset_resolver(&self) {
        self.runtime.resolver.reset();
    }

    /// Resolve `target` with the current resolver
    #[must_use]
    pub fn resolve(&self, target: &Target) -> Variant {
        self.runtime.resolver.resolve(target)
    }

    /// Owner-level variant assignment
    ///
    /// Finalizes `owner`'s queued member attachments with `variant` and
    /// records it in the variant registry. An ignored downgrade leaves the
    /// registry on the settled variant.
    pub fn assign_variant(&self, owner: &Target, variant: impl Into<Variant>) -> ReplayReport {
        let variant = variant.into();
        tracing::info!(owner = %owner, %variant, "assigning variant");
        self.runtime.scheduler.finalize(owner, variant)
    }

    /// Finalize `owner` with its assigned variant (or default) now
    pub fn settle(&self, owner: &Target) -> ReplayReport {
        self.runtime.scheduler.settle(owner)
    }

    /// Record a library's self-registration
    ///
    /// # Errors
    /// Returns [`varan_metadata::MetadataError::DuplicateRegistration`] on a repeated name
    pub fn register_library(&self, name: &str, version: &str) -> MetadataResult<()> {
        self.runtime.store.register_library(name, version)
    }

    /// Metadata store
    #[inline]
    #[must_use]
    pub fn metadata(&self) -> &MetadataStore {
        &self.runtime.store
    }

    /// Registry table
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &RegistryTable {
        &self.runtime.table
    }

    /// Deferred scheduler
    #[inline]
    #[must_use]
    pub fn scheduler(&self) -> &DeferredScheduler {
        &self.runtime.scheduler
    }

    /// Runtime configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AnnotationsConfig {
        &self.runtime.config
    }
}

impl Default for Annotations {
    fn default() -> Self {
        Self::new(AnnotationsConfig::default())
    }
}

impl fmt::Debug for Annotations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Annotations")
            .field("config", &self.runtime.config)
            .field("keys", &self.runtime.table.len())
            .field("custom_resolver", &self.runtime.resolver.is_custom())
            .finish_non_exhaustive()
    }
}

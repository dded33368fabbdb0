//! Variant resolver slot
//!
//! One swappable `(target) -> variant` function. The slot starts empty, which
//! resolves every target to the default variant. Nothing is memoized: a new
//! resolver affects the very next resolution.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use varan_metadata::{Target, Variant};

/// Installed resolver function
pub type ResolverFn = Arc<dyn Fn(&Target) -> Variant + Send + Sync>;

/// Holder of the current variant resolver
#[derive(Default)]
pub struct ResolverSlot {
    current: RwLock<Option<ResolverFn>>,
}

impl ResolverSlot {
    /// Slot resolving everything to the default variant
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the resolver
    pub fn install<F>(&self, resolver: F)
    where
        F: Fn(&Target) -> Variant + Send + Sync + 'static,
    {
        *self.current.write() = Some(Arc::new(resolver));
        tracing::debug!("custom variant resolver installed");
    }

    /// Return to the always-default resolver
    pub fn reset(&self) {
        *self.current.write() = None;
    }

    /// Whether a custom resolver is installed
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.current.read().is_some()
    }

    /// Resolve `target`'s variant with the current resolver
    #[must_use]
    pub fn resolve(&self, target: &Target) -> Variant {
        // Released before calling out so the resolver may swap itself.
        let resolver = self.current.read().clone();
        match resolver {
            Some(resolve) => resolve(target),
            None => Variant::default(),
        }
    }
}

impl fmt::Debug for ResolverSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverSlot")
            .field("custom", &self.is_custom())
            .finish()
    }
}

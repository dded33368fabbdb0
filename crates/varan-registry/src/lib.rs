//! Varan Annotation Registry
//!
//! Variant-aware behavior table and the dispatch algorithm.
//!
//! # Core Concepts
//!
//! - [`Entry`]: direct behavior or parameterized factory, tagged at registration
//! - [`RegistryTable`]: `(key, variant)` to base set plus extension set
//! - [`ResolverSlot`]: the swappable target-to-variant function
//! - [`AttachSite`]: what a behavior sees while it runs
//!
//! # Example
//!
//! ```rust
//! use varan_metadata::{MetadataStore, Target, Variant};
//! use varan_registry::{AnnotationKey, Entry, Invocation, RegistryTable};
//!
//! let table = RegistryTable::new();
//! let key = AnnotationKey::new("entity");
//! table
//!     .define(&key, &Variant::default(), vec![Entry::from_fn("mark", |site| {
//!         site.write("entity", true)?;
//!         Ok(None)
//!     })])
//!     .unwrap();
//!
//! let store = MetadataStore::default();
//! let user = Target::aggregate("User");
//! table
//!     .dispatch(&store, None, &key, &Variant::default(), Invocation::owner(&user))
//!     .unwrap();
//! assert_eq!(store.get(&user, "entity").unwrap(), Some(true.into()));
//! ```

#![warn(missing_docs)]

mod entry;
mod error;
mod key;
mod resolver;
mod site;
mod table;

// Re-exports
pub use entry::{
    check_entries, push_unique, Behavior, BehaviorFactory, BehaviorResult, Entry, Replacement,
};
pub use error::{AnnotationError, AnnotationResult, ApplicationError, ConfigurationError};
pub use key::AnnotationKey;
pub use resolver::{ResolverFn, ResolverSlot};
pub use site::{AttachSite, Attached, Invocation, TypeOracle};
pub use table::{Composed, RegistryEntry, RegistryTable};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

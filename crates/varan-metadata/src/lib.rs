//! Varan Metadata Store
//!
//! Per-target nested key/value storage for annotation facts.
//!
//! # Core Concepts
//!
//! - [`Target`]: Stable identity of an aggregate or function, linked to its parent
//! - [`MetaPath`]: Dot-delimited addressing inside a bucket
//! - [`MetadataStore`]: Buckets, chain-merged reads, property index, mirroring
//! - [`MetadataDiff`]: First-write record used to roll back a provisional run
//! - [`VariantRegistry`]: Which targets are assigned to which variant
//!
//! # Example
//!
//! ```rust
//! use varan_metadata::{MetadataStore, Target};
//!
//! let store = MetadataStore::default();
//! let base = Target::aggregate("Entity");
//! let user = Target::derive("User", &base);
//!
//! store.set(&base, "properties.id.type", "u64").unwrap();
//! store.set(&user, "properties.name.type", "string").unwrap();
//!
//! let id = store.get(&user, "properties.id.type").unwrap();
//! assert_eq!(id, Some("u64".into()));
//! ```

#![warn(missing_docs)]

mod descriptor;
mod diff;
mod error;
mod library;
mod path;
mod phase;
mod store;
mod target;
pub mod tree;
mod variant;

// Re-exports
pub use descriptor::{Descriptor, MemberKind};
pub use diff::{DiffEntry, MetadataDiff};
pub use error::{MetadataError, MetadataResult};
pub use library::LibraryRegistry;
pub use path::{MetaPath, PathError, DESCRIPTION, METHODS, PROPERTIES};
pub use phase::{ReadBarrier, ResolutionPhase};
pub use store::{MetadataStore, StoreConfig};
pub use target::{SharedBucket, Target, TargetId, TargetKind};
pub use variant::{Variant, VariantRegistry};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

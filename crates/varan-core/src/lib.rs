//! Varan Core - variant-aware annotations
//!
//! Ties the registry, the deferred scheduler and the metadata store into one
//! runtime context:
//! - Configure behaviors per key and variant with a fluent builder
//! - Attach them at owner, field and function level
//! - Defer member attachments until the owner's variant is known
//! - Read merged metadata across inheritance chains
//!
//! # Example
//!
//! ```rust
//! use varan_core::prelude::*;
//!
//! let annotations = Annotations::default();
//! let column = annotations
//!     .for_key("column")
//!     .define(vec![Entry::from_fn("column", |site| {
//!         site.write("column", site.variant.as_str())?;
//!         Ok(None)
//!     })])
//!     .unwrap()
//!     .apply()
//!     .unwrap();
//!
//! let user = Target::aggregate("User");
//! // Members are attached before the owner knows its variant.
//! column.attach(Invocation::member(&user, "name", None)).unwrap();
//! annotations.assign_variant(&user, "sql");
//!
//! let value = annotations.metadata().get(&user, "properties.name.column").unwrap();
//! assert_eq!(value, Some("sql".into()));
//! ```

#![warn(missing_docs)]

mod annotations;
mod builder;
mod config;
mod dispatcher;
mod error;
pub mod telemetry;

// Re-exports
pub use annotations::Annotations;
pub use builder::AnnotationBuilder;
pub use config::{AnnotationsConfig, LogFormat};
pub use dispatcher::{AttachOutcome, Dispatcher};
pub use error::{VaranError, VaranResult};
pub use telemetry::init_tracing;

pub use varan_metadata::{
    Descriptor, MemberKind, MetaPath, MetadataError, MetadataStore, ResolutionPhase, Target,
    TargetKind, Variant,
};
pub use varan_registry::{
    AnnotationError, AnnotationKey, ApplicationError, AttachSite, Attached, Behavior,
    BehaviorFactory, BehaviorResult, ConfigurationError, Entry, Invocation, Replacement,
    TypeOracle,
};
pub use varan_scheduler::{ReplayFailure, ReplayReport, Scheduled, SkipReason};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for defining and attaching annotations
    pub use crate::{
        AnnotationError, AnnotationKey, Annotations, AnnotationsConfig, AttachOutcome, AttachSite,
        Descriptor, Dispatcher, Entry, Invocation, Replacement, Target, TypeOracle, Variant,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

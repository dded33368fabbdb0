//! Registry entries
//!
//! An [`Entry`] is either a direct behavior or a parameterized factory that
//! builds one from its arguments at dispatch time. The tag is checked when the
//! entry is registered, so malformed registrations fail near their cause.

use crate::error::{AnnotationError, ApplicationError, ConfigurationError};
use crate::key::AnnotationKey;
use crate::site::AttachSite;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use varan_metadata::{Descriptor, Target, Variant};

/// Optional behavior return value
#[derive(Debug, Clone, PartialEq)]
pub enum Replacement {
    /// New aggregate fed to the next owner-level behavior
    Target(Target),
    /// New descriptor fed to the next member-level behavior
    Descriptor(Descriptor),
}

/// What a behavior returns
pub type BehaviorResult = Result<Option<Replacement>, AnnotationError>;

/// A unit of annotation behavior
pub trait Behavior: Send + Sync {
    /// Run against the attach site
    ///
    /// # Errors
    /// Returns error if the behavior cannot be applied
    fn apply(&self, site: &AttachSite<'_>) -> BehaviorResult;

    /// Label used in logs and errors
    fn label(&self) -> &str {
        "behavior"
    }
}

/// Builds a behavior from registration-time arguments
pub trait BehaviorFactory: Send + Sync {
    /// Produce the concrete entry for `args`
    ///
    /// # Errors
    /// Returns error if the arguments are unusable
    fn build(&self, args: &[Value]) -> Result<Entry, AnnotationError>;

    /// Label used in logs and errors
    fn label(&self) -> &str {
        "factory"
    }
}

struct FnBehavior<F> {
    label: String,
    f: F,
}

impl<F> Behavior for FnBehavior<F>
where
    F: Fn(&AttachSite<'_>) -> BehaviorResult + Send + Sync,
{
    fn apply(&self, site: &AttachSite<'_>) -> BehaviorResult {
        (self.f)(site)
    }

    fn label(&self) -> &str {
        &self.label
    }
}

struct FnFactory<F> {
    label: String,
    f: F,
}

impl<F> BehaviorFactory for FnFactory<F>
where
    F: Fn(&[Value]) -> Result<Entry, AnnotationError> + Send + Sync,
{
    fn build(&self, args: &[Value]) -> Result<Entry, AnnotationError> {
        (self.f)(args)
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Registered behavior: direct, or factory plus arguments
#[derive(Clone)]
pub enum Entry {
    /// Invoked directly with the attach site
    Behavior(Arc<dyn Behavior>),

    /// `factory(args)` yields the behavior that is then invoked
    Parameterized {
        /// Behavior factory
        factory: Arc<dyn BehaviorFactory>,
        /// Arguments captured at registration
        args: Vec<Value>,
    },
}

impl Entry {
    /// Wrap a behavior value
    #[must_use]
    pub fn behavior(behavior: impl Behavior + 'static) -> Self {
        Self::Behavior(Arc::new(behavior))
    }

    /// Wrap a closure as a labelled behavior
    #[must_use]
    pub fn from_fn<F>(label: impl Into<String>, f: F) -> Self
    where
        F: Fn(&AttachSite<'_>) -> BehaviorResult + Send + Sync + 'static,
    {
        Self::Behavior(Arc::new(FnBehavior {
            label: label.into(),
            f,
        }))
    }

    /// Factory entry with arguments
    #[must_use]
    pub fn parameterized(factory: impl BehaviorFactory + 'static, args: Vec<Value>) -> Self {
        Self::Parameterized {
            factory: Arc::new(factory),
            args,
        }
    }

    /// Closure factory entry with arguments
    #[must_use]
    pub fn factory_fn<F>(label: impl Into<String>, f: F, args: Vec<Value>) -> Self
    where
        F: Fn(&[Value]) -> Result<Entry, AnnotationError> + Send + Sync + 'static,
    {
        Self::Parameterized {
            factory: Arc::new(FnFactory {
                label: label.into(),
                f,
            }),
            args,
        }
    }

    /// Check if this is a factory entry
    #[inline]
    #[must_use]
    pub fn is_parameterized(&self) -> bool {
        matches!(self, Self::Parameterized { .. })
    }

    /// Label of the behavior or factory
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Behavior(b) => b.label(),
            Self::Parameterized { factory, .. } => factory.label(),
        }
    }

    /// Identity comparison: same allocation (and same arguments for factories)
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Behavior(a), Self::Behavior(b)) => {
                std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
            }
            (
                Self::Parameterized { factory: fa, args: aa },
                Self::Parameterized { factory: fb, args: ab },
            ) => {
                std::ptr::eq(Arc::as_ptr(fa).cast::<()>(), Arc::as_ptr(fb).cast::<()>()) && aa == ab
            }
            _ => false,
        }
    }

    /// Resolve to a directly callable behavior
    ///
    /// # Errors
    /// Returns [`ApplicationError`] if the factory fails or yields another factory
    pub fn materialize(
        &self,
        key: &AnnotationKey,
        variant: &Variant,
        position: usize,
    ) -> Result<Arc<dyn Behavior>, ApplicationError> {
        match self {
            Self::Behavior(behavior) => Ok(Arc::clone(behavior)),
            Self::Parameterized { factory, args } => match factory.build(args) {
                Ok(Self::Behavior(behavior)) => Ok(behavior),
                Ok(Self::Parameterized { factory: nested, .. }) => {
                    Err(ApplicationError::UnresolvedEntry {
                        key: key.clone(),
                        variant: variant.clone(),
                        position,
                        label: nested.label().to_string(),
                    })
                }
                Err(source) => Err(ApplicationError::FactoryFailed {
                    key: key.clone(),
                    variant: variant.clone(),
                    label: factory.label().to_string(),
                    source: Box::new(source),
                }),
            },
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Behavior(b) => f.debug_tuple("Behavior").field(&b.label()).finish(),
            Self::Parameterized { factory, args } => f
                .debug_struct("Parameterized")
                .field("factory", &factory.label())
                .field("args", args)
                .finish(),
        }
    }
}

/// Reject a registration call carrying more than one parameterized entry
///
/// # Errors
/// Returns [`ConfigurationError::MultipleParameterized`]
pub fn check_entries(
    key: &AnnotationKey,
    variant: &Variant,
    entries: &[Entry],
) -> Result<(), ConfigurationError> {
    let count = entries.iter().filter(|e| e.is_parameterized()).count();
    if count > 1 {
        return Err(ConfigurationError::MultipleParameterized {
            key: key.clone(),
            variant: variant.clone(),
            count,
        });
    }
    Ok(())
}

/// Append `entries` to `set`, skipping ones already present
pub fn push_unique(set: &mut Vec<Entry>, entries: impl IntoIterator<Item = Entry>) {
    for entry in entries {
        if !set.iter().any(|existing| existing.same_as(&entry)) {
            set.push(entry);
        }
    }
}

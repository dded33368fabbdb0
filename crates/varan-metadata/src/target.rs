//! Target identity
//!
//! A [`Target`] is the stable identity of an aggregate or a function. It keys
//! both the metadata store and the scheduler state, and links to its parent so
//! reads can walk the inheritance chain.

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

/// Live bucket storage shared between the store and a target's mirror slot
pub type SharedBucket = Arc<RwLock<Map<String, Value>>>;

/// Unique target identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetId(pub Uuid);

impl TargetId {
    /// Generate new target ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of definition a target stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    /// Class-like aggregate owning fields and functions
    Aggregate,
    /// Free-standing function
    Function,
}

struct TargetInner {
    id: TargetId,
    name: String,
    kind: TargetKind,
    parent: Option<Target>,
    mirror: OnceCell<SharedBucket>,
}

/// Handle to an annotated definition
///
/// Cloning is cheap and preserves identity: equality and hashing use the
/// [`TargetId`] only.
#[derive(Clone)]
pub struct Target(Arc<TargetInner>);

impl Target {
    fn build(name: impl Into<String>, kind: TargetKind, parent: Option<Target>) -> Self {
        Self(Arc::new(TargetInner {
            id: TargetId::new(),
            name: name.into(),
            kind,
            parent,
            mirror: OnceCell::new(),
        }))
    }

    /// New root aggregate
    #[must_use]
    pub fn aggregate(name: impl Into<String>) -> Self {
        Self::build(name, TargetKind::Aggregate, None)
    }

    /// New aggregate inheriting from `parent`
    #[must_use]
    pub fn derive(name: impl Into<String>, parent: &Target) -> Self {
        Self::build(name, TargetKind::Aggregate, Some(parent.clone()))
    }

    /// New free-standing function
    #[must_use]
    pub fn function(name: impl Into<String>) -> Self {
        Self::build(name, TargetKind::Function, None)
    }

    /// Identity token
    #[inline]
    #[must_use]
    pub fn id(&self) -> TargetId {
        self.0.id
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Target kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> TargetKind {
        self.0.kind
    }

    /// Direct parent, if any
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&Target> {
        self.0.parent.as_ref()
    }

    /// Iterate from this target up to the root of its chain
    pub fn ancestors(&self) -> impl Iterator<Item = &Target> {
        std::iter::successors(Some(self), |t| t.parent())
    }

    /// Inheritance chain ordered most-base first, ending with `self`
    #[must_use]
    pub fn chain(&self) -> Vec<Target> {
        let mut chain: Vec<Target> = self.ancestors().cloned().collect();
        chain.reverse();
        chain
    }

    /// Snapshot of the mirrored bucket, if mirroring attached one
    #[must_use]
    pub fn mirrored(&self) -> Option<Value> {
        self.0
            .mirror
            .get()
            .map(|bucket| Value::Object(bucket.read().clone()))
    }

    /// Whether a mirror slot has been attached
    #[inline]
    #[must_use]
    pub fn has_mirror(&self) -> bool {
        self.0.mirror.get().is_some()
    }

    /// Attach the live bucket once; later calls leave the first one in place
    pub(crate) fn install_mirror(&self, bucket: &SharedBucket) -> bool {
        self.0.mirror.set(Arc::clone(bucket)).is_ok()
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Target {}

impl Hash for Target {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.0.name)
            .field("kind", &self.0.kind)
            .field("id", &self.0.id)
            .field("parent", &self.0.parent.as_ref().map(Target::name))
            .finish()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

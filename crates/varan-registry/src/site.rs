//! Attach sites
//!
//! An [`AttachSite`] is what one behavior sees when it runs: the target, the
//! member (for field/function-level attachments), the descriptor threaded
//! from the previous behavior, and handles to the metadata store and the
//! declared-type oracle.

use crate::key::AnnotationKey;
use serde_json::Value;
use varan_metadata::{Descriptor, MetaPath, MetadataResult, MetadataStore, Target, Variant};

/// Host-supplied declared-type information
///
/// The core stores whatever this returns without validating it.
pub trait TypeOracle: Send + Sync {
    /// Declared type of `member` on `target`
    fn declared_type(&self, target: &Target, member: &str) -> Option<Value>;

    /// Declared parameter types of function `member` on `target`
    fn signature(&self, _target: &Target, _member: &str) -> Option<Vec<Value>> {
        None
    }
}

/// Context handed to each behavior during dispatch
pub struct AttachSite<'a> {
    /// Metadata store receiving write-through
    pub store: &'a MetadataStore,
    /// Declared-type oracle, when the host supplied one
    pub oracle: Option<&'a dyn TypeOracle>,
    /// Key being dispatched
    pub key: &'a AnnotationKey,
    /// Variant the composed list was resolved for
    pub variant: &'a Variant,
    /// Current target (possibly replaced by an earlier owner-level behavior)
    pub target: Target,
    /// Member name for field/function-level attachments
    pub member: Option<&'a str>,
    /// Current descriptor (possibly replaced by an earlier member-level behavior)
    pub descriptor: Option<Descriptor>,
}

impl AttachSite<'_> {
    /// Whether this is a member-level attachment
    #[inline]
    #[must_use]
    pub fn is_member(&self) -> bool {
        self.member.is_some()
    }

    /// `properties.<member>` for member-level sites
    #[must_use]
    pub fn member_path(&self) -> Option<MetaPath> {
        self.member.map(MetaPath::property)
    }

    /// Ask the oracle for the member's declared type
    #[must_use]
    pub fn declared_type(&self) -> Option<Value> {
        let member = self.member?;
        self.oracle?.declared_type(&self.target, member)
    }

    /// Ask the oracle for the member's declared signature
    #[must_use]
    pub fn signature(&self) -> Option<Vec<Value>> {
        let member = self.member?;
        self.oracle?.signature(&self.target, member)
    }

    /// Write `value` under `properties.<member>.<field>` (or `<field>` at owner level)
    ///
    /// # Errors
    /// Returns error if the store rejects the write
    pub fn write(&self, field: &str, value: impl Into<Value>) -> MetadataResult<()> {
        let path = match self.member_path() {
            Some(base) => base.child(field),
            None => MetaPath::single(field),
        };
        self.store.set_at(&self.target, &path, value.into())
    }
}

/// Arguments of one dispatch call: `(target, member?, descriptor?)`
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Aggregate or function being annotated
    pub target: Target,
    /// Member name, `None` for owner-level attachments
    pub member: Option<String>,
    /// Incoming member descriptor
    pub descriptor: Option<Descriptor>,
}

impl Invocation {
    /// Owner-level invocation
    #[must_use]
    pub fn owner(target: &Target) -> Self {
        Self {
            target: target.clone(),
            member: None,
            descriptor: None,
        }
    }

    /// Member-level invocation
    #[must_use]
    pub fn member(target: &Target, member: impl Into<String>, descriptor: Option<Descriptor>) -> Self {
        Self {
            target: target.clone(),
            member: Some(member.into()),
            descriptor,
        }
    }
}

/// What dispatch hands back once every composed behavior has run
#[derive(Debug, Clone, PartialEq)]
pub struct Attached {
    /// Final target after owner-level replacements
    pub target: Target,
    /// Final descriptor after member-level replacements
    pub descriptor: Option<Descriptor>,
}

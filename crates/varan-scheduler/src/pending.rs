//! Pending member attachments

use std::fmt;
use std::sync::Arc;
use varan_metadata::{Descriptor, MetadataDiff, Target, Variant};
use varan_registry::{AnnotationKey, AnnotationResult};

/// Deferred dispatch: runs the member's composed behaviors for a variant,
/// starting from the given descriptor
pub type PendingFn =
    Arc<dyn Fn(&Variant, Option<Descriptor>) -> AnnotationResult<Option<Descriptor>> + Send + Sync>;

/// One member attachment waiting for (or already applied under) an owner variant
pub struct PendingEntry {
    owner: Target,
    member: String,
    key: AnnotationKey,
    arguments: Option<Descriptor>,
    invoke: PendingFn,
    pub(crate) last_pass: u64,
    pub(crate) last_variant: Option<Variant>,
    pub(crate) diff: MetadataDiff,
    /// Descriptor installed before this entry's result, when it installed one
    pub(crate) snapshot: Option<Option<Descriptor>>,
}

impl PendingEntry {
    /// Create entry for `owner.member` under `key`
    pub fn new<F>(
        owner: &Target,
        member: impl Into<String>,
        key: AnnotationKey,
        arguments: Option<Descriptor>,
        invoke: F,
    ) -> Self
    where
        F: Fn(&Variant, Option<Descriptor>) -> AnnotationResult<Option<Descriptor>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            owner: owner.clone(),
            member: member.into(),
            key,
            arguments,
            invoke: Arc::new(invoke),
            last_pass: 0,
            last_variant: None,
            diff: MetadataDiff::new(),
            snapshot: None,
        }
    }

    /// Owning aggregate
    #[inline]
    #[must_use]
    pub fn owner(&self) -> &Target {
        &self.owner
    }

    /// Member name
    #[inline]
    #[must_use]
    pub fn member(&self) -> &str {
        &self.member
    }

    /// Annotation key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &AnnotationKey {
        &self.key
    }

    /// Descriptor the host passed at attach time
    #[inline]
    #[must_use]
    pub fn arguments(&self) -> Option<&Descriptor> {
        self.arguments.as_ref()
    }

    /// Variant this entry was last applied under
    #[inline]
    #[must_use]
    pub fn applied_with(&self) -> Option<&Variant> {
        self.last_variant.as_ref()
    }

    pub(crate) fn invoker(&self) -> PendingFn {
        Arc::clone(&self.invoke)
    }
}

impl fmt::Debug for PendingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingEntry")
            .field("owner", &self.owner)
            .field("member", &self.member)
            .field("key", &self.key)
            .field("last_pass", &self.last_pass)
            .field("last_variant", &self.last_variant)
            .field("diff_len", &self.diff.len())
            .finish_non_exhaustive()
    }
}

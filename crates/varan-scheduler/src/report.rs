//! Outcome of a finalize pass

use varan_metadata::{Descriptor, Variant};
use varan_registry::{AnnotationError, AnnotationKey};

/// Why a finalize call did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Owner was already being finalized further up the stack
    Reentrant,
    /// Default requested after a non-default variant settled
    Downgrade,
}

/// A queued entry that failed during replay
#[derive(Debug)]
pub struct ReplayFailure {
    /// Member the entry was attached to
    pub member: String,
    /// Annotation key of the entry
    pub key: AnnotationKey,
    /// What went wrong
    pub error: AnnotationError,
}

/// Summary of one finalize call
#[derive(Debug)]
pub struct ReplayReport {
    /// Variant the owner was finalized with
    pub variant: Variant,
    /// Entries invoked in this pass
    pub applied: usize,
    /// Superseded entries reverted before replay
    pub rolled_back: usize,
    /// Entries whose invocation failed
    pub failures: Vec<ReplayFailure>,
    /// Set when the call was ignored
    pub skipped: Option<SkipReason>,
}

impl ReplayReport {
    pub(crate) fn new(variant: Variant) -> Self {
        Self {
            variant,
            applied: 0,
            rolled_back: 0,
            failures: Vec::new(),
            skipped: None,
        }
    }

    pub(crate) fn skipped(variant: Variant, reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::new(variant)
        }
    }

    /// Check if every invoked entry succeeded
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Where a member-level attachment ended up
#[derive(Debug)]
pub enum Scheduled {
    /// Ran at once under the owner's settled variant
    Applied {
        /// Variant used
        variant: Variant,
        /// Descriptor after every behavior ran
        descriptor: Option<Descriptor>,
    },
    /// Waiting for the owner's variant
    Queued {
        /// Entries of this owner not yet applied
        pending: usize,
    },
    /// Queued, then finalized at once with the resolver's non-default answer
    Resolved(ReplayReport),
}

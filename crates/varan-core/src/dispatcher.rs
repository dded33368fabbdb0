//! Attach-ready dispatcher
//!
//! A [`Dispatcher`] is what [`crate::AnnotationBuilder::apply`] returns. The
//! host calls [`Dispatcher::attach`] for every place the annotation appears.
//! Owner-level attachments run at once. Member-level attachments go through
//! the deferred scheduler unless the dispatcher is bound to a variant.

use crate::annotations::Runtime;
use std::fmt;
use std::sync::Arc;
use varan_metadata::{Descriptor, Variant};
use varan_registry::{AnnotationKey, AnnotationResult, Attached, Invocation};
use varan_scheduler::{PendingEntry, Scheduled};

/// Where an attachment ended up
#[derive(Debug)]
pub enum AttachOutcome {
    /// Behaviors ran at once
    Applied(Attached),
    /// Member attachment handed to the scheduler
    Scheduled(Scheduled),
}

impl AttachOutcome {
    /// Final descriptor when the behaviors already ran
    #[must_use]
    pub fn descriptor(&self) -> Option<&Descriptor> {
        match self {
            Self::Applied(attached) => attached.descriptor.as_ref(),
            Self::Scheduled(Scheduled::Applied { descriptor, .. }) => descriptor.as_ref(),
            Self::Scheduled(_) => None,
        }
    }

    /// Check if the attachment is still waiting for its owner's variant
    #[must_use]
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Scheduled(Scheduled::Queued { .. }))
    }
}

/// Dispatch function for one annotation key
#[derive(Clone)]
pub struct Dispatcher {
    key: AnnotationKey,
    bound: Option<Variant>,
    runtime: Arc<Runtime>,
}

impl Dispatcher {
    pub(crate) fn new(key: AnnotationKey, runtime: Arc<Runtime>) -> Self {
        Self {
            key,
            bound: None,
            runtime,
        }
    }

    /// Annotation key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &AnnotationKey {
        &self.key
    }

    /// Variant this dispatcher always uses, if bound
    #[inline]
    #[must_use]
    pub fn bound(&self) -> Option<&Variant> {
        self.bound.as_ref()
    }

    /// Copy of this dispatcher that skips the resolver and uses `variant`
    #[must_use]
    pub fn bound_to(&self, variant: impl Into<Variant>) -> Self {
        Self {
            bound: Some(variant.into()),
            ..self.clone()
        }
    }

    /// Run the composed behaviors now
    ///
    /// The variant is the bound one, or the resolver's answer for the target.
    ///
    /// # Errors
    /// Returns the first entry or behavior error
    pub fn dispatch(&self, invocation: Invocation) -> AnnotationResult<Attached> {
        let variant = self
            .bound
            .clone()
            .unwrap_or_else(|| self.runtime.resolver.resolve(&invocation.target));
        let oracle = self.runtime.oracle();
        self.runtime.table.dispatch(
            &self.runtime.store,
            oracle.as_deref(),
            &self.key,
            &variant,
            invocation,
        )
    }

    /// Attach the annotation at a host definition site
    ///
    /// # Errors
    /// Returns errors raised while the behaviors run at once; failures of
    /// queued entries are reported by the finalize pass instead
    pub fn attach(&self, invocation: Invocation) -> AnnotationResult<AttachOutcome> {
        let Some(member) = invocation.member.clone() else {
            return self.dispatch(invocation).map(AttachOutcome::Applied);
        };

        if self.bound.is_some() {
            let owner = invocation.target.clone();
            let attached = self.dispatch(invocation)?;
            if let Some(descriptor) = &attached.descriptor {
                self.runtime
                    .store
                    .define_member(&owner, &member, Some(descriptor.clone()));
            }
            return Ok(AttachOutcome::Applied(attached));
        }

        let entry = self.pending(invocation, member);
        self.runtime
            .scheduler
            .attach(entry)
            .map(AttachOutcome::Scheduled)
    }

    fn pending(&self, invocation: Invocation, member: String) -> PendingEntry {
        let Invocation {
            target: owner,
            descriptor,
            ..
        } = invocation;
        let table = Arc::clone(&self.runtime.table);
        let store = Arc::clone(&self.runtime.store);
        let oracle = self.runtime.oracle();
        let key = self.key.clone();
        let target = owner.clone();
        let name = member.clone();

        PendingEntry::new(&owner, member, self.key.clone(), descriptor, move |variant, input| {
            let invocation = Invocation::member(&target, name.as_str(), input);
            table
                .dispatch(&store, oracle.as_deref(), &key, variant, invocation)
                .map(|attached| attached.descriptor)
        })
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("key", &self.key)
            .field("bound", &self.bound)
            .finish_non_exhaustive()
    }
}

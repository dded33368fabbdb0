//! Deferred application scheduler
//!
//! Member-level attachments arrive before the owner-level attachment that
//! decides the owner's variant. [`DeferredScheduler`] queues them per owner
//! and applies them once the variant is known, either when the owner is
//! finalized, when a custom resolver answers eagerly, or when a metadata read
//! reaches a pending owner.
//!
//! Every application runs inside a metadata capture. If the owner is later
//! finalized with a different variant, the superseded applications are
//! reverted newest first (metadata diff plus member descriptor) and the queue
//! is replayed in arrival order.

use crate::pending::{PendingEntry, PendingFn};
use crate::report::{ReplayFailure, ReplayReport, Scheduled, SkipReason};
use crate::state::{validate_transition, OwnerState};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use varan_metadata::{
    Descriptor, MetadataDiff, MetadataStore, ReadBarrier, ResolutionPhase, Target, TargetId,
    Variant,
};
use varan_registry::{AnnotationKey, AnnotationResult, ResolverSlot};

/// Per-owner queue of member attachments with rollback-and-replay finalize
pub struct DeferredScheduler {
    store: Arc<MetadataStore>,
    resolver: Arc<ResolverSlot>,
    eager: bool,
    owners: Mutex<HashMap<TargetId, OwnerState>>,
}

/// Work item copied out of the queue so no lock is held while it runs
struct Job {
    index: usize,
    member: String,
    key: AnnotationKey,
    arguments: Option<Descriptor>,
    invoke: PendingFn,
}

struct Rollback {
    member: String,
    diff: MetadataDiff,
    snapshot: Option<Option<Descriptor>>,
}

struct Outcome {
    result: AnnotationResult<Option<Descriptor>>,
    diff: MetadataDiff,
    snapshot: Option<Option<Descriptor>>,
}

impl DeferredScheduler {
    /// Create scheduler and register it as `store`'s read barrier
    ///
    /// With `eager` set, a custom resolver is consulted on every queued
    /// attachment and a non-default answer finalizes the owner at once.
    #[must_use]
    pub fn new(store: Arc<MetadataStore>, resolver: Arc<ResolverSlot>, eager: bool) -> Arc<Self> {
        let scheduler = Arc::new(Self {
            store,
            resolver,
            eager,
            owners: Mutex::new(HashMap::new()),
        });
        let weak = Arc::downgrade(&scheduler);
        let barrier: Weak<dyn ReadBarrier> = weak;
        scheduler.store.install_barrier(barrier);
        scheduler
    }

    /// Metadata store this scheduler writes through
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.store
    }

    /// Route a member-level attachment
    ///
    /// Owners already finalized with a non-default variant apply the entry at
    /// once. Otherwise the entry is queued and the owner marked pending; an
    /// entry arriving mid-finalize joins the running pass.
    ///
    /// # Errors
    /// Returns the entry's error when it is applied at once
    pub fn attach(&self, mut entry: PendingEntry) -> AnnotationResult<Scheduled> {
        let owner = entry.owner().clone();

        let direct = {
            let mut owners = self.owners.lock();
            let state = owners
                .entry(owner.id())
                .or_insert_with(|| OwnerState::new(&owner));
            state
                .settled
                .clone()
                .filter(|_| state.direct_apply && !state.applying)
                .map(|variant| (variant, state.pass))
        };

        if let Some((variant, pass)) = direct {
            tracing::debug!(owner = %owner, member = entry.member(), variant = %variant, "applying member directly");
            let outcome = self.run(
                &owner,
                entry.member(),
                entry.arguments().cloned(),
                &entry.invoker(),
                &variant,
            );
            entry.last_pass = pass;
            entry.last_variant = Some(variant.clone());
            entry.diff = outcome.diff;
            entry.snapshot = outcome.snapshot;
            self.with_state(&owner, |state| state.queue.push(entry));
            let descriptor = outcome.result?;
            return Ok(Scheduled::Applied {
                variant,
                descriptor,
            });
        }

        tracing::debug!(owner = %owner, member = entry.member(), key = %entry.key(), "queueing member attachment");
        let pending = self.with_state(&owner, |state| {
            state.queue.push(entry);
            state.unapplied()
        });
        self.transition(&owner, ResolutionPhase::Pending);

        if self.eager && self.resolver.is_custom() {
            let variant = self.resolver.resolve(&owner);
            if !variant.is_default() {
                let report = self.finalize(&owner, variant);
                if report.skipped.is_none() {
                    return Ok(Scheduled::Resolved(report));
                }
            }
        }

        Ok(Scheduled::Queued { pending })
    }

    /// Apply `owner`'s queue under `variant`
    ///
    /// Entries applied earlier under another variant are reverted and
    /// replayed. Failures are logged and collected; the rest of the queue
    /// still runs. A finalize that is not skipped records `variant` in the
    /// store's variant registry.
    pub fn finalize(&self, owner: &Target, variant: Variant) -> ReplayReport {
        let prepared = self.with_state(owner, |state| {
            if state.applying {
                return Err(SkipReason::Reentrant);
            }
            if state.direct_apply && variant.is_default() {
                return Err(SkipReason::Downgrade);
            }
            state.applying = true;
            state.pass += 1;

            let rollbacks: Vec<Rollback> = state
                .queue
                .iter_mut()
                .rev()
                .filter(|e| e.last_variant.as_ref().is_some_and(|v| *v != variant))
                .map(|e| {
                    e.last_variant = None;
                    Rollback {
                        member: e.member().to_string(),
                        diff: std::mem::take(&mut e.diff),
                        snapshot: e.snapshot.take(),
                    }
                })
                .collect();
            Ok((state.pass, rollbacks))
        });

        let (pass, rollbacks) = match prepared {
            Ok(prepared) => prepared,
            Err(reason) => {
                match reason {
                    SkipReason::Reentrant => {
                        tracing::trace!(owner = %owner, "finalize already in progress");
                    }
                    SkipReason::Downgrade => {
                        tracing::warn!(
                            owner = %owner,
                            settled = ?self.settled_variant(owner),
                            "ignoring default finalize after a non-default variant settled"
                        );
                    }
                }
                return ReplayReport::skipped(variant, reason);
            }
        };

        let previous = self.store.assign_variant(owner, variant.clone());
        if previous != variant {
            tracing::debug!(owner = %owner, %previous, variant = %variant, "variant recorded");
        }

        let mut report = ReplayReport::new(variant.clone());

        for rollback in rollbacks {
            self.store.revert(&rollback.diff);
            if let Some(previous) = rollback.snapshot {
                self.store.define_member(owner, &rollback.member, previous);
            }
            report.rolled_back += 1;
        }

        let mut cursor = 0;
        while let Some(job) = self.next_job(owner, &variant, pass, &mut cursor) {
            let outcome = self.run(owner, &job.member, job.arguments, &job.invoke, &variant);
            report.applied += 1;

            self.with_state(owner, |state| {
                if let Some(entry) = state.queue.get_mut(job.index) {
                    entry.last_variant = Some(variant.clone());
                    entry.diff = outcome.diff;
                    entry.snapshot = outcome.snapshot;
                }
            });

            if let Err(error) = outcome.result {
                tracing::error!(
                    owner = %owner,
                    member = %job.member,
                    key = %job.key,
                    %error,
                    "queued attachment failed"
                );
                report.failures.push(ReplayFailure {
                    member: job.member,
                    key: job.key,
                    error,
                });
            }
        }

        self.with_state(owner, |state| {
            state.applying = false;
            state.settled = Some(variant.clone());
            if !variant.is_default() {
                state.direct_apply = true;
            }
        });
        self.transition(owner, ResolutionPhase::Resolved);

        tracing::info!(
            owner = %owner,
            variant = %variant,
            applied = report.applied,
            rolled_back = report.rolled_back,
            failures = report.failures.len(),
            "owner finalized"
        );
        report
    }

    /// Finalize `owner` with its assigned variant, or default
    pub fn settle(&self, owner: &Target) -> ReplayReport {
        let variant = self.store.variant_of(owner).unwrap_or_default();
        self.finalize(owner, variant)
    }

    /// Whether late member attachments for `owner` apply immediately
    #[must_use]
    pub fn is_direct(&self, owner: &Target) -> bool {
        self.owners
            .lock()
            .get(&owner.id())
            .is_some_and(|state| state.direct_apply)
    }

    /// Variant `owner` was last finalized with
    #[must_use]
    pub fn settled_variant(&self, owner: &Target) -> Option<Variant> {
        self.owners
            .lock()
            .get(&owner.id())
            .and_then(|state| state.settled.clone())
    }

    /// Attachments of `owner` not yet applied under any variant
    #[must_use]
    pub fn pending_len(&self, owner: &Target) -> usize {
        self.owners
            .lock()
            .get(&owner.id())
            .map_or(0, OwnerState::unapplied)
    }

    /// Every attachment recorded for `owner`
    #[must_use]
    pub fn queued_len(&self, owner: &Target) -> usize {
        self.owners
            .lock()
            .get(&owner.id())
            .map_or(0, |state| state.queue.len())
    }

    /// Resolution phase of `owner`
    #[must_use]
    pub fn phase(&self, owner: &Target) -> ResolutionPhase {
        self.store.phase(owner)
    }

    fn with_state<R>(&self, owner: &Target, f: impl FnOnce(&mut OwnerState) -> R) -> R {
        let mut owners = self.owners.lock();
        let state = owners
            .entry(owner.id())
            .or_insert_with(|| OwnerState::new(owner));
        f(state)
    }

    fn next_job(&self, owner: &Target, variant: &Variant, pass: u64, cursor: &mut usize) -> Option<Job> {
        self.with_state(owner, |state| {
            while let Some(entry) = state.queue.get_mut(*cursor) {
                let index = *cursor;
                *cursor += 1;
                if entry.last_variant.as_ref() == Some(variant) || entry.last_pass == pass {
                    continue;
                }
                entry.last_pass = pass;
                return Some(Job {
                    index,
                    member: entry.member().to_string(),
                    key: entry.key().clone(),
                    arguments: entry.arguments().cloned(),
                    invoke: entry.invoker(),
                });
            }
            None
        })
    }

    fn run(
        &self,
        owner: &Target,
        member: &str,
        arguments: Option<Descriptor>,
        invoke: &PendingFn,
        variant: &Variant,
    ) -> Outcome {
        // Stacked annotations on one member see the descriptor installed before them.
        let input = self.store.own_member(owner, member).or(arguments);
        let (result, diff) = self.store.capture(|| invoke(variant, input));
        let snapshot = match &result {
            Ok(Some(descriptor)) => Some(self.store.define_member(owner, member, Some(descriptor.clone()))),
            _ => None,
        };
        Outcome {
            result,
            diff,
            snapshot,
        }
    }

    fn transition(&self, owner: &Target, to: ResolutionPhase) {
        let from = self.store.phase(owner);
        match validate_transition(from, to) {
            Ok(()) => self.store.set_phase(owner, to),
            Err(err) => tracing::warn!(owner = %owner, %err, "phase change refused"),
        }
    }
}

impl ReadBarrier for DeferredScheduler {
    fn settle(&self, target: &Target) {
        let report = DeferredScheduler::settle(self, target);
        tracing::trace!(owner = %target, applied = report.applied, "settled on read");
    }
}

impl fmt::Debug for DeferredScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredScheduler")
            .field("eager", &self.eager)
            .field("owners", &self.owners.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use varan_metadata::MetaPath;
    use varan_registry::AnnotationError;

    type Log = Arc<Mutex<Vec<String>>>;

    fn setup(eager: bool) -> (Arc<MetadataStore>, Arc<ResolverSlot>, Arc<DeferredScheduler>) {
        let store = Arc::new(MetadataStore::default());
        let resolver = Arc::new(ResolverSlot::new());
        let scheduler = DeferredScheduler::new(Arc::clone(&store), Arc::clone(&resolver), eager);
        (store, resolver, scheduler)
    }

    /// Entry writing `properties.<member>.kind = <variant>` and logging the call
    fn writer(store: &Arc<MetadataStore>, owner: &Target, member: &str, log: &Log) -> PendingEntry {
        let store = Arc::clone(store);
        let target = owner.clone();
        let name = member.to_string();
        let log = Arc::clone(log);
        PendingEntry::new(owner, member, AnnotationKey::new("kind"), None, move |variant, _| {
            log.lock().push(format!("{name}:{variant}"));
            store.set_at(
                &target,
                &MetaPath::property(name.as_str()).child("kind"),
                json!(variant.as_str()),
            )?;
            Ok(None)
        })
    }

    #[test]
    fn queued_until_finalize() {
        let (store, _, scheduler) = setup(true);
        let owner = Target::aggregate("User");
        let log = Log::default();

        let scheduled = scheduler.attach(writer(&store, &owner, "name", &log)).unwrap();
        assert!(matches!(scheduled, Scheduled::Queued { pending: 1 }));
        assert_eq!(scheduler.phase(&owner), ResolutionPhase::Pending);
        assert!(log.lock().is_empty());

        let report = scheduler.finalize(&owner, Variant::new("x"));
        assert_eq!(report.applied, 1);
        assert!(report.is_clean());
        assert_eq!(*log.lock(), vec!["name:x"]);
        assert_eq!(scheduler.phase(&owner), ResolutionPhase::Resolved);
        assert!(scheduler.is_direct(&owner));
        assert_eq!(scheduler.settled_variant(&owner), Some(Variant::new("x")));
        assert_eq!(scheduler.pending_len(&owner), 0);
    }

    #[test]
    fn direct_apply_after_non_default_finalize() {
        let (store, _, scheduler) = setup(true);
        let owner = Target::aggregate("User");
        let log = Log::default();

        scheduler.finalize(&owner, Variant::new("x"));
        let scheduled = scheduler.attach(writer(&store, &owner, "late", &log)).unwrap();

        assert!(matches!(scheduled, Scheduled::Applied { ref variant, .. } if *variant == Variant::new("x")));
        assert_eq!(*log.lock(), vec!["late:x"]);
        assert_eq!(
            store.get_own(&owner, &"properties.late.kind".parse().unwrap()),
            Some(json!("x"))
        );
    }

    #[test]
    fn read_settles_pending_owner_with_default() {
        let (store, _, scheduler) = setup(true);
        let owner = Target::aggregate("User");
        let log = Log::default();

        scheduler.attach(writer(&store, &owner, "name", &log)).unwrap();
        let kind = store.get(&owner, "properties.name.kind").unwrap();

        assert_eq!(kind, Some(json!("default")));
        assert_eq!(scheduler.phase(&owner), ResolutionPhase::Resolved);
        assert!(!scheduler.is_direct(&owner));
    }

    #[test]
    fn read_uses_assigned_variant() {
        let (store, _, scheduler) = setup(true);
        let owner = Target::aggregate("User");
        let log = Log::default();

        scheduler.attach(writer(&store, &owner, "name", &log)).unwrap();
        store.assign_variant(&owner, Variant::new("y"));

        assert_eq!(store.get(&owner, "properties.name.kind").unwrap(), Some(json!("y")));
    }

    #[test]
    fn provisional_default_is_rolled_back() {
        let (store, _, scheduler) = setup(true);
        let owner = Target::aggregate("User");
        let log = Log::default();

        scheduler.attach(writer(&store, &owner, "a", &log)).unwrap();
        scheduler.settle(&owner);
        scheduler.attach(writer(&store, &owner, "b", &log)).unwrap();

        let report = scheduler.finalize(&owner, Variant::new("x"));
        assert_eq!(report.rolled_back, 1);
        assert_eq!(report.applied, 2);
        assert_eq!(*log.lock(), vec!["a:default", "a:x", "b:x"]);
        assert_eq!(store.get(&owner, "properties.a.kind").unwrap(), Some(json!("x")));
        assert_eq!(store.get(&owner, "properties.b.kind").unwrap(), Some(json!("x")));
    }

    #[test]
    fn rollback_removes_paths_the_new_variant_skips() {
        let (store, _, scheduler) = setup(true);
        let owner = Target::aggregate("User");

        let entry = {
            let store = Arc::clone(&store);
            let target = owner.clone();
            PendingEntry::new(&owner, "f", AnnotationKey::new("k"), None, move |variant, _| {
                if variant.is_default() {
                    store.set(&target, "properties.f.legacy", true)?;
                }
                store.set(&target, "properties.f.seen", variant.as_str())?;
                Ok(None)
            })
        };
        scheduler.attach(entry).unwrap();
        scheduler.settle(&owner);
        assert_eq!(store.get(&owner, "properties.f.legacy").unwrap(), Some(json!(true)));

        scheduler.finalize(&owner, Variant::new("x"));
        assert_eq!(store.get(&owner, "properties.f.legacy").unwrap(), None);
        assert_eq!(store.get(&owner, "properties.f.seen").unwrap(), Some(json!("x")));
    }

    #[test]
    fn descriptor_snapshots_restore_in_reverse() {
        let (store, _, scheduler) = setup(true);
        let owner = Target::aggregate("User");

        let tag = |label: &'static str| {
            PendingEntry::new(&owner, "f", AnnotationKey::new(label), None, move |variant, input| {
                let base = input.unwrap_or_else(Descriptor::field);
                let mut trail = base.value.as_array().cloned().unwrap_or_default();
                trail.push(json!(format!("{label}:{variant}")));
                Ok(Some(base.with_value(trail)))
            })
        };
        scheduler.attach(tag("one")).unwrap();
        scheduler.attach(tag("two")).unwrap();
        scheduler.settle(&owner);
        scheduler.finalize(&owner, Variant::new("x"));

        let installed = store.member(&owner, "f").unwrap();
        assert_eq!(installed.value, json!(["one:x", "two:x"]));
    }

    #[test]
    fn failure_does_not_stop_replay() {
        let (store, _, scheduler) = setup(true);
        let owner = Target::aggregate("User");
        let log = Log::default();

        scheduler.attach(writer(&store, &owner, "a", &log)).unwrap();
        scheduler
            .attach(PendingEntry::new(&owner, "bad", AnnotationKey::new("k"), None, |_, _| {
                Err(AnnotationError::behavior("boom", "broken"))
            }))
            .unwrap();
        scheduler.attach(writer(&store, &owner, "c", &log)).unwrap();

        let report = scheduler.finalize(&owner, Variant::new("x"));
        assert_eq!(report.applied, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].member, "bad");
        assert_eq!(*log.lock(), vec!["a:x", "c:x"]);
    }

    #[test]
    fn default_after_non_default_is_ignored() {
        let (store, _, scheduler) = setup(true);
        let owner = Target::aggregate("User");
        let log = Log::default();

        scheduler.attach(writer(&store, &owner, "a", &log)).unwrap();
        scheduler.finalize(&owner, Variant::new("x"));
        let report = scheduler.finalize(&owner, Variant::default());

        assert_eq!(report.skipped, Some(SkipReason::Downgrade));
        assert_eq!(scheduler.settled_variant(&owner), Some(Variant::new("x")));
        assert_eq!(*log.lock(), vec!["a:x"]);
    }

    #[test]
    fn ignored_downgrade_keeps_registry_on_settled_variant() {
        let (store, _, scheduler) = setup(true);
        let owner = Target::aggregate("User");

        scheduler.finalize(&owner, Variant::new("x"));
        scheduler.finalize(&owner, Variant::default());

        assert_eq!(store.variant_of(&owner), scheduler.settled_variant(&owner));
        assert_eq!(store.members_of(&Variant::new("x")), vec![owner.id()]);
        assert!(store.members_of(&Variant::default()).is_empty());
    }

    #[test]
    fn same_variant_finalize_is_idempotent() {
        let (store, _, scheduler) = setup(true);
        let owner = Target::aggregate("User");
        let log = Log::default();

        scheduler.attach(writer(&store, &owner, "a", &log)).unwrap();
        scheduler.finalize(&owner, Variant::new("x"));
        let report = scheduler.finalize(&owner, Variant::new("x"));

        assert_eq!(report.applied, 0);
        assert_eq!(report.rolled_back, 0);
        assert_eq!(*log.lock(), vec!["a:x"]);
    }

    #[test]
    fn eager_resolver_finalizes_on_attach() {
        let (store, resolver, scheduler) = setup(true);
        let owner = Target::aggregate("User");
        let log = Log::default();
        resolver.install(|_: &Target| Variant::new("flv"));

        let scheduled = scheduler.attach(writer(&store, &owner, "a", &log)).unwrap();
        assert!(matches!(scheduled, Scheduled::Resolved(ref r) if r.applied == 1));
        assert!(scheduler.is_direct(&owner));
        assert_eq!(store.variant_of(&owner), Some(Variant::new("flv")));
        assert_eq!(store.members_of(&Variant::new("flv")), vec![owner.id()]);
    }

    #[test]
    fn property_list_settles_pending_owner() {
        let (store, _, scheduler) = setup(true);
        let owner = Target::aggregate("User");
        let log = Log::default();

        scheduler.attach(writer(&store, &owner, "f", &log)).unwrap();

        assert_eq!(store.properties(&owner), vec!["f"]);
        assert_eq!(scheduler.phase(&owner), ResolutionPhase::Resolved);
    }

    #[test]
    fn eager_disabled_keeps_queue() {
        let (store, resolver, scheduler) = setup(false);
        let owner = Target::aggregate("User");
        let log = Log::default();
        resolver.install(|_: &Target| Variant::new("flv"));

        let scheduled = scheduler.attach(writer(&store, &owner, "a", &log)).unwrap();
        assert!(matches!(scheduled, Scheduled::Queued { .. }));
    }

    #[test]
    fn eager_default_answer_keeps_queue() {
        let (store, resolver, scheduler) = setup(true);
        let owner = Target::aggregate("User");
        let log = Log::default();
        resolver.install(|_: &Target| Variant::default());

        let scheduled = scheduler.attach(writer(&store, &owner, "a", &log)).unwrap();
        assert!(matches!(scheduled, Scheduled::Queued { pending: 1 }));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn reentrant_read_does_not_recurse() {
        let (store, _, scheduler) = setup(true);
        let owner = Target::aggregate("User");
        let reads = Log::default();

        let entry = {
            let store = Arc::clone(&store);
            let target = owner.clone();
            let reads = Arc::clone(&reads);
            PendingEntry::new(&owner, "a", AnnotationKey::new("k"), None, move |_, _| {
                store.set(&target, "properties.a.done", true)?;
                // Reading the owner mid-pass hits the read barrier.
                let seen = store.get(&target, "properties.a.done")?;
                reads.lock().push(format!("{seen:?}"));
                Ok(None)
            })
        };
        scheduler.attach(entry).unwrap();
        let report = scheduler.finalize(&owner, Variant::new("x"));

        assert_eq!(report.applied, 1);
        assert_eq!(reads.lock().len(), 1);
    }

    #[test]
    fn reentrant_attach_joins_current_pass() {
        let (store, _, scheduler) = setup(true);
        let owner = Target::aggregate("User");
        let log = Log::default();

        let spawner = {
            let scheduler = Arc::downgrade(&scheduler);
            let store = Arc::clone(&store);
            let target = owner.clone();
            let log = Arc::clone(&log);
            PendingEntry::new(&owner, "first", AnnotationKey::new("k"), None, move |variant, _| {
                log.lock().push(format!("first:{variant}"));
                if let Some(scheduler) = scheduler.upgrade() {
                    if scheduler.queued_len(&target) == 1 {
                        scheduler.attach(writer(&store, &target, "second", &log))?;
                    }
                }
                Ok(None)
            })
        };
        scheduler.attach(spawner).unwrap();
        let report = scheduler.finalize(&owner, Variant::new("x"));

        assert_eq!(report.applied, 2);
        assert_eq!(*log.lock(), vec!["first:x", "second:x"]);
    }
}

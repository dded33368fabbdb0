//! Metadata store
//!
//! Provides [`MetadataStore`]: one nested bucket per target, merged across the
//! inheritance chain on every read. The store also keeps the side tables the
//! scheduler relies on (phase markers, member descriptors, the variant
//! registry) and records first writes while a capture is active so a
//! provisional run can be reverted.

use crate::descriptor::Descriptor;
use crate::diff::MetadataDiff;
use crate::error::{MetadataError, MetadataResult};
use crate::library::LibraryRegistry;
use crate::path::{MetaPath, PROPERTIES};
use crate::phase::{ReadBarrier, ResolutionPhase};
use crate::target::{SharedBucket, Target, TargetId};
use crate::tree;
use crate::variant::{Variant, VariantRegistry};
use dashmap::DashMap;
use indexmap::IndexSet;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Store behavior switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Attach each target's live bucket to the target on first write
    pub mirror: bool,
}

impl StoreConfig {
    /// With mirroring enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }
}

/// Per-target metadata storage
pub struct MetadataStore {
    config: StoreConfig,
    buckets: RwLock<HashMap<TargetId, SharedBucket>>,
    properties: DashMap<TargetId, IndexSet<String>>,
    members: DashMap<(TargetId, String), Descriptor>,
    phases: DashMap<TargetId, ResolutionPhase>,
    variants: RwLock<VariantRegistry>,
    libraries: Mutex<LibraryRegistry>,
    captures: Mutex<Vec<MetadataDiff>>,
    barrier: RwLock<Option<Weak<dyn ReadBarrier>>>,
}

impl MetadataStore {
    /// Create empty store
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            buckets: RwLock::new(HashMap::new()),
            properties: DashMap::new(),
            members: DashMap::new(),
            phases: DashMap::new(),
            variants: RwLock::new(VariantRegistry::new()),
            libraries: Mutex::new(LibraryRegistry::new()),
            captures: Mutex::new(Vec::new()),
            barrier: RwLock::new(None),
        }
    }

    /// Store configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> StoreConfig {
        self.config
    }

    /// Install the hook that settles pending owners before reads
    pub fn install_barrier(&self, barrier: Weak<dyn ReadBarrier>) {
        *self.barrier.write() = Some(barrier);
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Merged bucket for `target` and its ancestors
    ///
    /// Pending targets on the chain are settled first.
    #[must_use]
    pub fn get_bucket(&self, target: &Target) -> Option<Value> {
        self.settle_chain(target);
        self.merged(target).map(Value::Object)
    }

    /// Merged value at `path` (dot-delimited; empty string = whole bucket)
    ///
    /// # Errors
    /// Returns error if `path` is malformed
    pub fn get(&self, target: &Target, path: &str) -> MetadataResult<Option<Value>> {
        let path: MetaPath = path.parse()?;
        Ok(self.get_at(target, &path))
    }

    /// Merged value at a parsed path
    #[must_use]
    pub fn get_at(&self, target: &Target, path: &MetaPath) -> Option<Value> {
        self.settle_chain(target);
        let merged = self.merged(target)?;
        if path.is_empty() {
            return Some(Value::Object(merged));
        }
        tree::lookup(&merged, path).cloned()
    }

    /// Value at `path` in `target`'s own bucket only; no merge, no settling
    #[must_use]
    pub fn get_own(&self, target: &Target, path: &MetaPath) -> Option<Value> {
        let bucket = self.bucket(target.id())?;
        let guard = bucket.read();
        if path.is_empty() {
            return Some(Value::Object(guard.clone()));
        }
        tree::lookup(&guard, path).cloned()
    }

    /// Whether `target` has a bucket of its own
    #[inline]
    #[must_use]
    pub fn has_bucket(&self, target: &Target) -> bool {
        self.buckets.read().contains_key(&target.id())
    }

    fn bucket(&self, id: TargetId) -> Option<SharedBucket> {
        self.buckets.read().get(&id).cloned()
    }

    fn bucket_or_create(&self, id: TargetId) -> SharedBucket {
        if let Some(bucket) = self.bucket(id) {
            return bucket;
        }
        Arc::clone(self.buckets.write().entry(id).or_default())
    }

    fn merged(&self, target: &Target) -> Option<Map<String, Value>> {
        let chain = target.chain();
        let buckets: Vec<SharedBucket> = {
            let map = self.buckets.read();
            chain.iter().filter_map(|t| map.get(&t.id()).cloned()).collect()
        };
        if buckets.is_empty() {
            return None;
        }
        let mut merged = Map::new();
        for bucket in buckets {
            tree::merge_maps(&mut merged, &bucket.read());
        }
        Some(merged)
    }

    fn settle_chain(&self, target: &Target) {
        let pending: Vec<Target> = target
            .chain()
            .into_iter()
            .filter(|t| self.phase(t) == ResolutionPhase::Pending)
            .collect();
        if pending.is_empty() {
            return;
        }
        let barrier = self.barrier.read().as_ref().and_then(Weak::upgrade);
        let Some(barrier) = barrier else {
            return;
        };
        for t in &pending {
            tracing::trace!(target_name = %t, "settling pending owner before read");
            barrier.settle(t);
        }
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Write `value` at `path`, creating intermediate containers
    ///
    /// # Errors
    /// Returns error if `path` is malformed or walks through a non-object
    pub fn set(&self, target: &Target, path: &str, value: impl Into<Value>) -> MetadataResult<()> {
        let path: MetaPath = path.parse()?;
        self.set_at(target, &path, value.into())
    }

    /// Write `value` at a parsed path
    ///
    /// # Errors
    /// Returns error if `path` is the root or walks through a non-object
    pub fn set_at(&self, target: &Target, path: &MetaPath, value: Value) -> MetadataResult<()> {
        let bucket = self.bucket_or_create(target.id());
        let previous = {
            let mut guard = bucket.write();
            let previous = tree::lookup(&guard, path).cloned();
            tree::insert(&mut guard, path, value.clone())?;
            previous
        };

        self.record(target, path, previous);
        if path.touches_properties() {
            self.index_write(target.id(), path, &value);
        }
        if self.config.mirror && !target.has_mirror() && target.install_mirror(&bucket) {
            tracing::trace!(target_name = %target, "mirrored metadata bucket onto target");
        }
        tracing::trace!(target_name = %target, %path, "metadata write");
        Ok(())
    }

    /// Delete the value at `path`, pruning ancestors left empty
    ///
    /// # Errors
    /// Returns error if `path` is malformed
    pub fn remove(&self, target: &Target, path: &str) -> MetadataResult<Option<Value>> {
        let path: MetaPath = path.parse()?;
        Ok(self.remove_at(target, &path))
    }

    /// Delete at a parsed path
    pub fn remove_at(&self, target: &Target, path: &MetaPath) -> Option<Value> {
        let bucket = self.bucket(target.id())?;
        let removed = tree::remove(&mut bucket.write(), path)?;
        self.record(target, path, Some(removed.clone()));
        if path.touches_properties() {
            self.reindex(target.id());
        }
        Some(removed)
    }

    /// Undo a captured diff, newest write first
    ///
    /// Reverted writes are not recorded into any active capture. The property
    /// index of every touched target is brought back in line with its bucket.
    pub fn revert(&self, diff: &MetadataDiff) {
        let mut touched: IndexSet<TargetId> = IndexSet::new();
        for entry in diff.entries().iter().rev() {
            let Some(bucket) = self.bucket(entry.target.id()) else {
                continue;
            };
            let mut guard = bucket.write();
            match &entry.previous {
                Some(value) => {
                    if let Err(err) = tree::insert(&mut guard, &entry.path, value.clone()) {
                        tracing::warn!(target_name = %entry.target, path = %entry.path, %err, "could not restore metadata value");
                    }
                }
                None => {
                    tree::remove(&mut guard, &entry.path);
                }
            }
            if entry.path.touches_properties() {
                touched.insert(entry.target.id());
            }
        }
        for id in touched {
            self.reindex(id);
        }
        tracing::debug!(paths = diff.len(), "reverted metadata diff");
    }

    // ---------------------------------------------------------------------
    // Capture
    // ---------------------------------------------------------------------

    /// Run `f` while recording every first write into a fresh diff
    ///
    /// Captures nest: writes land in the innermost active capture only.
    pub fn capture<R>(&self, f: impl FnOnce() -> R) -> (R, MetadataDiff) {
        let frame = CaptureFrame::open(self);
        let result = f();
        (result, frame.close())
    }

    fn record(&self, target: &Target, path: &MetaPath, previous: Option<Value>) {
        if let Some(top) = self.captures.lock().last_mut() {
            top.record(target, path, previous);
        }
    }

    // ---------------------------------------------------------------------
    // Property index
    // ---------------------------------------------------------------------

    /// Members written under `properties.*` for `target`, in first-write order
    ///
    /// Pending owners on the chain are settled first.
    #[must_use]
    pub fn properties(&self, target: &Target) -> Vec<String> {
        self.settle_chain(target);
        self.properties
            .get(&target.id())
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn index_write(&self, id: TargetId, path: &MetaPath, value: &Value) {
        let mut index = self.properties.entry(id).or_default();
        match path.property_name() {
            Some(member) => {
                index.insert(member.to_string());
            }
            None => {
                if let Value::Object(members) = value {
                    index.extend(members.keys().cloned());
                }
            }
        }
    }

    fn reindex(&self, id: TargetId) {
        let live: Vec<String> = self
            .bucket(id)
            .and_then(|bucket| {
                bucket
                    .read()
                    .get(PROPERTIES)
                    .and_then(Value::as_object)
                    .map(|members| members.keys().cloned().collect())
            })
            .unwrap_or_default();

        let mut index = self.properties.entry(id).or_default();
        index.retain(|member| live.contains(member));
        index.extend(live);
    }

    // ---------------------------------------------------------------------
    // Signatures
    // ---------------------------------------------------------------------

    /// Store the declared parameter list for `method` under
    /// `methods.<method>.parameters`
    ///
    /// # Errors
    /// Returns error if the `methods` subtree holds a non-object
    pub fn record_signature(
        &self,
        target: &Target,
        method: &str,
        parameters: Vec<Value>,
    ) -> MetadataResult<()> {
        let path = MetaPath::method(method).child("parameters");
        self.set_at(target, &path, Value::Array(parameters))
    }

    /// Declared type of parameter `index` of `method`
    ///
    /// # Errors
    /// Returns [`MetadataError::ParameterOutOfRange`] when `index` is not below
    /// the recorded parameter count
    pub fn parameter(&self, target: &Target, method: &str, index: usize) -> MetadataResult<Value> {
        let path = MetaPath::method(method).child("parameters");
        let parameters = match self.get_at(target, &path) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        parameters
            .get(index)
            .cloned()
            .ok_or(MetadataError::ParameterOutOfRange {
                method: method.to_string(),
                index,
                count: parameters.len(),
            })
    }

    // ---------------------------------------------------------------------
    // Member descriptors
    // ---------------------------------------------------------------------

    /// Install (or clear, with `None`) the descriptor for `owner.member`
    ///
    /// Returns the descriptor that was installed before.
    pub fn define_member(
        &self,
        owner: &Target,
        member: &str,
        descriptor: Option<Descriptor>,
    ) -> Option<Descriptor> {
        let key = (owner.id(), member.to_string());
        match descriptor {
            Some(descriptor) => self.members.insert(key, descriptor),
            None => self.members.remove(&key).map(|(_, d)| d),
        }
    }

    /// Descriptor installed for `owner.member`, after settling the chain
    #[must_use]
    pub fn member(&self, owner: &Target, member: &str) -> Option<Descriptor> {
        self.settle_chain(owner);
        self.own_member(owner, member)
    }

    /// Descriptor installed for `owner.member`; no settling
    #[must_use]
    pub fn own_member(&self, owner: &Target, member: &str) -> Option<Descriptor> {
        self.members
            .get(&(owner.id(), member.to_string()))
            .map(|d| d.clone())
    }

    // ---------------------------------------------------------------------
    // Phases
    // ---------------------------------------------------------------------

    /// Resolution phase recorded for `target`
    #[must_use]
    pub fn phase(&self, target: &Target) -> ResolutionPhase {
        self.phases
            .get(&target.id())
            .map(|p| *p)
            .unwrap_or_default()
    }

    /// Record `target`'s resolution phase
    pub fn set_phase(&self, target: &Target, phase: ResolutionPhase) {
        self.phases.insert(target.id(), phase);
    }

    // ---------------------------------------------------------------------
    // Variants
    // ---------------------------------------------------------------------

    /// Move `target` into `variant`'s bucket; returns the previous variant
    pub fn assign_variant(&self, target: &Target, variant: Variant) -> Variant {
        self.variants.write().assign(target.id(), variant)
    }

    /// Variant last assigned to `target`
    #[must_use]
    pub fn variant_of(&self, target: &Target) -> Option<Variant> {
        self.variants.read().variant_of(target.id()).cloned()
    }

    /// Targets currently assigned to `variant`
    #[must_use]
    pub fn members_of(&self, variant: &Variant) -> Vec<TargetId> {
        self.variants.read().members_of(variant)
    }

    // ---------------------------------------------------------------------
    // Libraries
    // ---------------------------------------------------------------------

    /// Record a library's self-registration
    ///
    /// # Errors
    /// Returns [`MetadataError::DuplicateRegistration`] if `name` was seen before
    pub fn register_library(&self, name: &str, version: &str) -> MetadataResult<()> {
        self.libraries.lock().register(name, version)?;
        tracing::info!(library = name, version, "library registered");
        Ok(())
    }

    /// Registered libraries in load order
    #[must_use]
    pub fn libraries(&self) -> Vec<(String, String)> {
        self.libraries
            .lock()
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }
}

impl Default for MetadataStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataStore")
            .field("config", &self.config)
            .field("buckets", &self.buckets.read().len())
            .field("members", &self.members.len())
            .field("captures", &self.captures.lock().len())
            .finish_non_exhaustive()
    }
}

/// Active capture; pops its frame even if the captured closure unwinds
struct CaptureFrame<'a> {
    store: &'a MetadataStore,
    open: bool,
}

impl<'a> CaptureFrame<'a> {
    fn open(store: &'a MetadataStore) -> Self {
        store.captures.lock().push(MetadataDiff::new());
        Self { store, open: true }
    }

    fn close(mut self) -> MetadataDiff {
        self.open = false;
        self.store.captures.lock().pop().unwrap_or_default()
    }
}

impl Drop for CaptureFrame<'_> {
    fn drop(&mut self) {
        if self.open {
            self.store.captures.lock().pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn set_and_get_path() {
        let store = MetadataStore::default();
        let t = Target::aggregate("User");
        store.set(&t, "properties.name.type", "string").unwrap();

        assert_eq!(store.get(&t, "properties.name.type").unwrap(), Some(json!("string")));
        assert_eq!(store.get(&t, "properties.missing.type").unwrap(), None);
        assert_eq!(
            store.get_bucket(&t),
            Some(json!({"properties": {"name": {"type": "string"}}}))
        );
    }

    #[test]
    fn get_without_bucket_is_none() {
        let store = MetadataStore::default();
        let t = Target::aggregate("Empty");
        assert_eq!(store.get_bucket(&t), None);
        assert_eq!(store.get(&t, "a").unwrap(), None);
    }

    #[test]
    fn derived_inherits_and_overrides() {
        let store = MetadataStore::default();
        let base = Target::aggregate("Base");
        let derived = Target::derive("Derived", &base);

        store.set(&base, "properties.id.type", "u64").unwrap();
        store.set(&base, "properties.id.required", true).unwrap();
        store.set(&base, "tags", json!(["a", "b"])).unwrap();
        store.set(&derived, "properties.id.type", "uuid").unwrap();
        store.set(&derived, "tags", json!(["c"])).unwrap();

        assert_eq!(
            store.get(&derived, "properties.id").unwrap(),
            Some(json!({"type": "uuid", "required": true}))
        );
        assert_eq!(store.get(&derived, "tags").unwrap(), Some(json!(["c"])));
        assert_eq!(store.get(&base, "properties.id.type").unwrap(), Some(json!("u64")));
    }

    #[test]
    fn derived_without_bucket_reads_ancestors() {
        let store = MetadataStore::default();
        let base = Target::aggregate("Base");
        let derived = Target::derive("Derived", &base);
        store.set(&base, "description.text", "base").unwrap();

        assert!(!store.has_bucket(&derived));
        assert_eq!(store.get(&derived, "description.text").unwrap(), Some(json!("base")));
        assert_eq!(store.get_own(&derived, &MetaPath::root()), None);
    }

    #[test]
    fn later_ancestor_writes_are_visible() {
        let store = MetadataStore::default();
        let base = Target::aggregate("Base");
        let derived = Target::derive("Derived", &base);
        store.set(&derived, "a", 1).unwrap();
        assert_eq!(store.get(&derived, "b").unwrap(), None);

        store.set(&base, "b", 2).unwrap();
        assert_eq!(store.get(&derived, "b").unwrap(), Some(json!(2)));
    }

    #[test]
    fn property_index_tracks_writes() {
        let store = MetadataStore::default();
        let t = Target::aggregate("User");
        store.set(&t, "properties.name.type", "string").unwrap();
        store.set(&t, "properties.age.type", "u32").unwrap();
        store.set(&t, "properties.name.required", true).unwrap();
        store.set(&t, "methods.save.returns", "bool").unwrap();

        assert_eq!(store.properties(&t), vec!["name", "age"]);
    }

    #[test]
    fn property_index_whole_subtree_write() {
        let store = MetadataStore::default();
        let t = Target::aggregate("User");
        store.set(&t, "properties", json!({"a": {}, "b": {}})).unwrap();
        assert_eq!(store.properties(&t), vec!["a", "b"]);
    }

    #[test]
    fn remove_updates_index_and_prunes() {
        let store = MetadataStore::default();
        let t = Target::aggregate("User");
        store.set(&t, "properties.name.type", "string").unwrap();
        store.set(&t, "properties.age.type", "u32").unwrap();

        store.remove(&t, "properties.name.type").unwrap();
        assert_eq!(store.properties(&t), vec!["age"]);
        assert_eq!(store.get(&t, "properties.name").unwrap(), None);
    }

    #[test]
    fn capture_and_revert_restores_previous_state() {
        let store = MetadataStore::default();
        let t = Target::aggregate("User");
        store.set(&t, "properties.name.type", "string").unwrap();
        let before = store.get_bucket(&t);

        let ((), diff) = store.capture(|| {
            store.set(&t, "properties.name.type", "text").unwrap();
            store.set(&t, "properties.name.max", 10).unwrap();
            store.set(&t, "properties.extra.flag", true).unwrap();
        });
        assert_eq!(diff.len(), 3);
        assert_eq!(store.properties(&t), vec!["name", "extra"]);

        store.revert(&diff);
        assert_eq!(store.get_bucket(&t), before);
        assert_eq!(store.properties(&t), vec!["name"]);
    }

    #[test]
    fn revert_restores_removed_values() {
        let store = MetadataStore::default();
        let t = Target::aggregate("User");
        store.set(&t, "properties.name.type", "string").unwrap();

        let (_, diff) = store.capture(|| store.remove(&t, "properties.name"));
        assert!(store.properties(&t).is_empty());

        store.revert(&diff);
        assert_eq!(store.get(&t, "properties.name.type").unwrap(), Some(json!("string")));
        assert_eq!(store.properties(&t), vec!["name"]);
    }

    #[test]
    fn writes_outside_capture_are_not_recorded() {
        let store = MetadataStore::default();
        let t = Target::aggregate("T");
        store.set(&t, "a", 1).unwrap();
        let ((), diff) = store.capture(|| {});
        assert!(diff.is_empty());
    }

    #[test]
    fn nested_capture_records_innermost_only() {
        let store = MetadataStore::default();
        let t = Target::aggregate("T");
        let ((inner_diff, ()), outer_diff) = store.capture(|| {
            store.set(&t, "outer", 1).unwrap();
            let ((), inner) = store.capture(|| store.set(&t, "inner", 2).unwrap());
            (inner, ())
        });
        assert_eq!(outer_diff.len(), 1);
        assert_eq!(inner_diff.len(), 1);
        assert_eq!(inner_diff.entries()[0].path.to_string(), "inner");
    }

    #[test]
    fn mirroring_exposes_live_bucket() {
        let store = MetadataStore::new(StoreConfig::default().with_mirror(true));
        let t = Target::aggregate("Mirrored");
        assert!(t.mirrored().is_none());

        store.set(&t, "a", 1).unwrap();
        store.set(&t, "b", 2).unwrap();
        assert_eq!(t.mirrored(), Some(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn mirroring_disabled_by_default() {
        let store = MetadataStore::default();
        let t = Target::aggregate("Plain");
        store.set(&t, "a", 1).unwrap();
        assert!(!t.has_mirror());
    }

    #[test]
    fn parameter_lookup_and_range_error() {
        let store = MetadataStore::default();
        let f = Target::aggregate("Service");
        store.record_signature(&f, "save", vec![json!("User")]).unwrap();

        assert_eq!(store.parameter(&f, "save", 0).unwrap(), json!("User"));
        let err = store.parameter(&f, "save", 2).unwrap_err();
        assert!(err.is_range_error());
        assert!(err.to_string().contains('2'));

        let unknown = store.parameter(&f, "load", 0).unwrap_err();
        assert!(matches!(unknown, MetadataError::ParameterOutOfRange { count: 0, .. }));
    }

    #[test]
    fn member_descriptor_table() {
        let store = MetadataStore::default();
        let t = Target::aggregate("T");
        assert!(store.define_member(&t, "f", Some(Descriptor::field())).is_none());
        let prev = store.define_member(&t, "f", Some(Descriptor::field().read_only()));
        assert_eq!(prev, Some(Descriptor::field()));
        assert!(!store.member(&t, "f").unwrap().writable);

        store.define_member(&t, "f", None);
        assert!(store.member(&t, "f").is_none());
    }

    #[test]
    fn variant_assignment_moves_target() {
        let store = MetadataStore::default();
        let t = Target::aggregate("T");
        store.assign_variant(&t, "x".into());
        store.assign_variant(&t, "y".into());

        assert!(store.members_of(&"x".into()).is_empty());
        assert_eq!(store.members_of(&"y".into()), vec![t.id()]);
        assert_eq!(store.variant_of(&t), Some(Variant::new("y")));
    }

    #[test]
    fn library_registration_guard() {
        let store = MetadataStore::default();
        store.register_library("L", "1.0").unwrap();
        let err = store.register_library("L", "1.0").unwrap_err();
        assert!(matches!(err, MetadataError::DuplicateRegistration { .. }));
        assert_eq!(store.libraries(), vec![("L".to_string(), "1.0".to_string())]);
    }

    struct CountingBarrier {
        store: Arc<MetadataStore>,
        calls: AtomicUsize,
    }

    impl ReadBarrier for CountingBarrier {
        fn settle(&self, target: &Target) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.store.set(target, "settled", true).unwrap();
            self.store.set_phase(target, ResolutionPhase::Resolved);
        }
    }

    #[test]
    fn pending_ancestor_is_settled_before_read() {
        let store = Arc::new(MetadataStore::default());
        let barrier = Arc::new(CountingBarrier {
            store: Arc::clone(&store),
            calls: AtomicUsize::new(0),
        });
        let weak: Weak<dyn ReadBarrier> = Arc::downgrade(&barrier) as Weak<dyn ReadBarrier>;
        store.install_barrier(weak);

        let base = Target::aggregate("Base");
        let derived = Target::derive("Derived", &base);
        store.set_phase(&base, ResolutionPhase::Pending);

        assert_eq!(store.get(&derived, "settled").unwrap(), Some(json!(true)));
        assert_eq!(barrier.calls.load(Ordering::SeqCst), 1);

        // resolved now; no second settle
        store.get_bucket(&derived);
        assert_eq!(barrier.calls.load(Ordering::SeqCst), 1);
    }
}

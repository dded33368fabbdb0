//! Metadata reads and writes through the runtime context

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use varan_core::prelude::*;
use varan_core::{AnnotationsConfig, MetaPath, MetadataError};
use varan_metadata::tree::deep_merge;
use varan_test_utils::{constant, sample_hierarchy, StaticOracle};

#[test]
fn three_level_chain_merges_objects_and_replaces_leaves() {
    let annotations = Annotations::default();
    let store = annotations.metadata();
    let (entity, person, employee) = sample_hierarchy();

    store.set(&entity, "properties.id", json!({ "type": "u64", "tags": ["pk"] })).unwrap();
    store.set(&entity, "description", "root").unwrap();
    store.set(&person, "properties.id.tags", json!(["pk", "person"])).unwrap();
    store.set(&person, "properties.name.type", "string").unwrap();
    store.set(&employee, "description", "leaf").unwrap();
    store.set(&employee, "properties.name.max", 80).unwrap();

    assert_eq!(
        store.get(&employee, "").unwrap(),
        Some(json!({
            "description": "leaf",
            "properties": {
                "id": { "type": "u64", "tags": ["pk", "person"] },
                "name": { "type": "string", "max": 80 },
            },
        }))
    );
    assert_eq!(store.get(&person, "description").unwrap(), Some(json!("root")));
    assert_eq!(store.get(&employee, "properties.missing.type").unwrap(), None);
}

#[test]
fn own_read_ignores_ancestors() {
    let annotations = Annotations::default();
    let store = annotations.metadata();
    let (entity, person, _) = sample_hierarchy();

    store.set(&entity, "properties.id.type", "u64").unwrap();
    store.set(&person, "properties.name.type", "string").unwrap();

    let own = store.get_own(&person, &MetaPath::root()).unwrap();
    assert_eq!(own, json!({ "properties": { "name": { "type": "string" } } }));
}

#[test]
fn duplicate_library_registration_fails() {
    let annotations = Annotations::default();
    annotations.register_library("L", "1.0").unwrap();

    let err = annotations.register_library("L", "1.0").unwrap_err();
    assert!(matches!(err, MetadataError::DuplicateRegistration { .. }));
    assert_eq!(
        annotations.metadata().libraries(),
        vec![("L".to_string(), "1.0".to_string())]
    );
}

#[test]
fn parameter_index_past_signature_is_range_error() {
    let annotations = Annotations::default();
    let store = annotations.metadata();
    let service = Target::aggregate("Service");

    store.record_signature(&service, "find", vec![json!("u64")]).unwrap();
    assert_eq!(store.parameter(&service, "find", 0).unwrap(), json!("u64"));

    let err = store.parameter(&service, "find", 2).unwrap_err();
    assert!(err.is_range_error());
    assert!(err.to_string().contains('2'));
}

#[test]
fn mirrored_bucket_tracks_later_writes() {
    let annotations = Annotations::new(AnnotationsConfig::new().with_mirror_metadata(true));
    let user = Target::aggregate("User");
    assert!(!user.has_mirror());

    annotations.metadata().set(&user, "a", 1).unwrap();
    annotations.metadata().set(&user, "b", 2).unwrap();

    assert_eq!(user.mirrored(), Some(json!({ "a": 1, "b": 2 })));
}

#[test]
fn no_mirror_by_default() {
    let annotations = Annotations::default();
    let user = Target::aggregate("User");
    annotations.metadata().set(&user, "a", 1).unwrap();
    assert!(user.mirrored().is_none());
}

#[test]
fn oracle_types_reach_behaviors() {
    let annotations = Annotations::default()
        .with_oracle(StaticOracle::new().with("User", "age", json!("u32")));
    let typed = annotations
        .for_key("typed")
        .define(vec![Entry::from_fn("typed", |site| {
            if let Some(declared) = site.declared_type() {
                site.write("type", declared)?;
            }
            Ok(None)
        })])
        .unwrap()
        .apply()
        .unwrap();
    let user = Target::aggregate("User");

    typed.attach(Invocation::member(&user, "age", None)).unwrap();
    typed.attach(Invocation::member(&user, "nick", None)).unwrap();
    annotations.assign_variant(&user, "v");

    assert_eq!(
        annotations.metadata().get(&user, "properties").unwrap(),
        Some(json!({ "age": { "type": "u32" } }))
    );
}

#[test]
fn property_index_follows_rollback() {
    let annotations = Annotations::default();
    let only_default = annotations
        .for_key("legacy")
        .define(vec![constant("legacy", "legacy", json!(true))])
        .unwrap()
        .variant("modern")
        .define(vec![Entry::from_fn("noop", |_| Ok(None))])
        .unwrap()
        .apply()
        .unwrap();
    let owner = Target::aggregate("Widget");

    only_default.attach(Invocation::member(&owner, "old", None)).unwrap();
    annotations.settle(&owner);
    assert_eq!(annotations.metadata().properties(&owner), vec!["old"]);

    annotations.assign_variant(&owner, "modern");
    assert!(annotations.metadata().properties(&owner).is_empty());
    assert_eq!(annotations.metadata().get(&owner, "properties").unwrap(), None);
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,4}".prop_map(Value::from),
        proptest::collection::vec(any::<bool>(), 0..3).prop_map(Value::from),
    ]
}

/// Keys `a`/`b` always hold objects and `x`/`y` always hold leaves, so a
/// path never changes kind between levels.
fn bucket() -> impl Strategy<Value = Value> {
    let nested = proptest::collection::btree_map("[cd]", leaf(), 0..3)
        .prop_map(|m| Value::Object(m.into_iter().collect()));
    (
        proptest::collection::btree_map("[ab]", nested, 0..3),
        proptest::collection::btree_map("[xy]", leaf(), 0..3),
    )
        .prop_map(|(objects, leaves)| {
            let mut map = Map::new();
            map.extend(objects);
            map.extend(leaves);
            Value::Object(map)
        })
}

proptest! {
    #[test]
    fn chain_read_is_associative_merge(a in bucket(), b in bucket(), c in bucket()) {
        let annotations = Annotations::default();
        let store = annotations.metadata();
        let (entity, person, employee) = sample_hierarchy();

        for (target, bucket) in [(&entity, &a), (&person, &b), (&employee, &c)] {
            if let Value::Object(map) = bucket {
                for (key, value) in map {
                    store.set(target, key, value.clone()).unwrap();
                }
            }
        }

        let mut left = a.clone();
        deep_merge(&mut left, &b);
        deep_merge(&mut left, &c);

        let mut right = b.clone();
        deep_merge(&mut right, &c);
        let mut grouped = a.clone();
        deep_merge(&mut grouped, &right);

        let read = store.get(&employee, "").unwrap().unwrap_or_else(|| json!({}));
        prop_assert_eq!(&read, &left);
        prop_assert_eq!(&read, &grouped);
    }
}

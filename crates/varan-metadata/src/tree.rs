//! Nested map operations and chain merging
//!
//! Buckets are JSON objects. Plain objects merge key by key; arrays and
//! primitives replace outright.

use crate::error::{MetadataError, MetadataResult};
use crate::path::MetaPath;
use serde_json::{Map, Value};

/// Walk `path` inside `map`; `None` on any missing segment
#[must_use]
pub fn lookup<'a>(map: &'a Map<String, Value>, path: &MetaPath) -> Option<&'a Value> {
    let (first, rest) = path.segments().split_first()?;
    let mut current = map.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write `value` at `path`, creating intermediate objects
///
/// Returns the value previously stored at `path`.
///
/// # Errors
/// Fails when an existing intermediate value is not an object.
pub fn insert(
    map: &mut Map<String, Value>,
    path: &MetaPath,
    value: Value,
) -> MetadataResult<Option<Value>> {
    let Some((leaf, parents)) = path.segments().split_last() else {
        return Err(MetadataError::NotAContainer {
            path: path.clone(),
            blocked_at: MetaPath::root(),
        });
    };

    let mut current = map;
    for (depth, segment) in parents.iter().enumerate() {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match slot {
            Value::Object(next) => next,
            _ => {
                return Err(MetadataError::NotAContainer {
                    path: path.clone(),
                    blocked_at: MetaPath::new(parents[..=depth].to_vec()),
                })
            }
        };
    }
    Ok(current.insert(leaf.clone(), value))
}

/// Delete the value at `path`, then prune ancestors left empty
pub fn remove(map: &mut Map<String, Value>, path: &MetaPath) -> Option<Value> {
    let removed = remove_leaf(map, path.segments())?;
    let mut parent = path.parent();
    while let Some(prefix) = parent {
        if prefix.is_empty() || !is_empty_object(map, &prefix) {
            break;
        }
        remove_leaf(map, prefix.segments());
        parent = prefix.parent();
    }
    Some(removed)
}

fn remove_leaf(map: &mut Map<String, Value>, segments: &[String]) -> Option<Value> {
    let (leaf, parents) = segments.split_last()?;
    let mut current = map;
    for segment in parents {
        current = current.get_mut(segment)?.as_object_mut()?;
    }
    current.remove(leaf)
}

fn is_empty_object(map: &Map<String, Value>, path: &MetaPath) -> bool {
    matches!(lookup(map, path), Some(Value::Object(inner)) if inner.is_empty())
}

/// Merge `overlay` into `base`: objects recurse, everything else replaces
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            merge_maps(base_map, overlay_map);
        }
        (slot, _) => *slot = overlay.clone(),
    }
}

/// [`deep_merge`] at the map level
pub fn merge_maps(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        match base.get_mut(key) {
            Some(existing) => deep_merge(existing, value),
            None => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

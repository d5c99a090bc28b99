//! path-addressed tree merging
//!
//! [merge_into] places one value into a tree:
//! - `@` deep-merges an object into the root
//! - `a__b__c` or `a.b.c` (`__` wins when present) walks/creates objects and assigns the last segment
//!
//! [deep_merge] semantics:
//! - Objects: deep-merge by key (recursive)
//! - Arrays: REPLACE (last wins)
//! - Scalars: override (last wins)
use crate::value::{Map, Value};
use crate::{Error, Result};

/// Path that addresses the root of a tree
pub const ROOT: &str = "@";

/// Deep merge two values, `overlay` wins
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.get_mut(&key) {
                    Some(base_value) => deep_merge(std::mem::take(base_value), overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Split `a__b` / `a.b` into segments
pub fn split_path(path: &str) -> Vec<&str> {
    if path.contains("__") {
        path.split("__").collect()
    } else {
        path.split('.').collect()
    }
}

/// Assign `value` at `path` in `tree`
#[tracing::instrument(level = "trace", skip(tree, value))]
pub fn merge_into(tree: Value, path: &str, value: Value) -> Result<Value> {
    if path == ROOT {
        if !value.is_object() {
            return Err(Error::RootValueNotObject {
                value: value.to_text(),
            });
        }
        return Ok(deep_merge(tree, value));
    }

    let mut tree = match tree {
        Value::Null => Value::Object(Map::new()),
        tree => tree,
    };

    let segments = split_path(path);
    let Some((last, parents)) = segments.split_last() else {
        return Ok(tree);
    };

    let Value::Object(root) = &mut tree else {
        return Err(Error::PathConflict {
            path: path.to_string(),
            segment: ROOT.to_string(),
        });
    };

    let mut edge: &mut Map = root;
    for segment in parents {
        let entry = edge
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if entry.is_null() {
            *entry = Value::Object(Map::new());
        }

        match entry {
            Value::Object(map) => edge = map,
            _ => {
                return Err(Error::PathConflict {
                    path: path.to_string(),
                    segment: segment.to_string(),
                })
            }
        }
    }

    edge.insert(last.to_string(), value);
    Ok(tree)
}

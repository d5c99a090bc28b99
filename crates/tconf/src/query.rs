//! read access to resolved trees
use crate::merge::split_path;
use crate::value::{Map, Value};
use crate::{Error, Result};

/// Value at the dotted `path`, `None` when a step is missing or not an object
pub fn get_path<'v>(tree: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.')
        .try_fold(tree, |node, key| node.as_object()?.get(key))
}

pub fn get_string(tree: &Value, path: &str) -> Option<String> {
    match get_path(tree, path)? {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        value => Some(value.to_text()),
    }
}

/// Numbers, or strings holding a whole number
pub fn get_number(tree: &Value, path: &str) -> Option<f64> {
    match get_path(tree, path)? {
        Value::Integer(number) => Some(*number as f64),
        Value::Decimal(number) => Some(*number),
        Value::String(text) => text.trim().parse::<i64>().ok().map(|number| number as f64),
        _ => None,
    }
}

/// Booleans, or `true`/`yes`/`false`/`no` strings
pub fn get_boolean(tree: &Value, path: &str) -> Option<bool> {
    match get_path(tree, path)? {
        Value::Boolean(value) => Some(*value),
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Sub-value at `a.b` or `a__b`
pub fn select_property<'v>(tree: &'v Value, property: &str) -> Option<&'v Value> {
    split_path(property)
        .into_iter()
        .try_fold(tree, |node, key| node.as_object()?.get(key))
}

/// Keep only the comma separated `keys` (`a.b` or `a__b`), with their parents
///
/// Keys that do not exist are left out. Anything but an object is returned unchanged.
pub fn filter_keys(tree: &Value, keys: &str) -> Value {
    let Value::Object(_) = tree else {
        return tree.clone();
    };

    let keys: Vec<&str> = keys
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .collect();
    if keys.is_empty() {
        return tree.clone();
    }

    let mut result = Map::new();
    for key in keys {
        let segments: Vec<&str> = split_path(key).into_iter().map(str::trim).collect();
        if let Some(value) = select_property(tree, &segments.join("__")) {
            insert_path(&mut result, &segments, value.clone());
        }
    }
    Value::Object(result)
}

/// Apply the `get` selectors, `property` and `keys` are mutually exclusive
///
/// A missing tree stays missing, a missing property is an error.
pub fn select(tree: Option<Value>, property: Option<&str>, keys: Option<&str>) -> Result<Option<Value>> {
    if property.is_some() && keys.is_some() {
        return Err(Error::ConflictingSelectors);
    }
    let Some(tree) = tree else {
        return Ok(None);
    };

    match (property, keys) {
        (Some(property), _) => select_property(&tree, property)
            .cloned()
            .map(Some)
            .ok_or_else(|| Error::PropertyNotFound {
                path: property.to_string(),
            }),
        (None, Some(keys)) => Ok(Some(filter_keys(&tree, keys))),
        (None, None) => Ok(Some(tree)),
    }
}

fn insert_path(map: &mut Map, segments: &[&str], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut edge = map;
    for segment in parents {
        let entry = edge
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        edge = next;
    }
    edge.insert(last.to_string(), value);
}

//! Deep merge for configuration documents.
//!
//! Mappings are merged key by key, with the incoming side taking precedence.
//! A `null` under an incoming key deletes that key from the base. Lists and
//! scalars are replaced entirely, never merged element-wise.

use serde_json::{Map, Value};

/// Deep merge two documents, with `incoming` taking precedence over `base`.
///
/// - Both mappings: merged recursively; `null` values delete the key
/// - Any other combination: `incoming` replaces `base` outright
///
/// Keys that only exist in `incoming` are copied in with their own nested
/// `null`s dropped, so a merge never leaves a literal null leaf behind.
///
/// Not associative across a delete: in `merge(merge(a, b), c)` a key that
/// `b` deletes and `c` sets again takes exactly `c`'s value, while in
/// `merge(a, merge(b, c))` the deletion is absorbed and `c`'s value is
/// merged over `a`'s. Layers are always folded left to right (see
/// [`deep_merge_all`]), so the later layer fully replaces a deleted key.
///
/// # Example
/// ```
/// use serde_json::json;
/// use boxen_deploy::config::deep_merge;
///
/// let base = json!({"WebHead": {"InstanceType": "m1.small", "Count": 2}});
/// let incoming = json!({"WebHead": {"InstanceType": "m1.large", "Count": null}});
/// let result = deep_merge(base, incoming);
/// assert_eq!(result, json!({"WebHead": {"InstanceType": "m1.large"}}));
/// ```
pub fn deep_merge(base: Value, incoming: Value) -> Value {
    match (base, incoming) {
        (Value::Object(mut base_map), Value::Object(incoming_map)) => {
            merge_into(&mut base_map, incoming_map);
            Value::Object(base_map)
        }
        (_, incoming) => strip_nulls(incoming),
    }
}

fn merge_into(base: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, incoming_value) in incoming {
        if incoming_value.is_null() {
            base.remove(&key);
            continue;
        }
        let merged = match base.remove(&key) {
            Some(base_value) => deep_merge(base_value, incoming_value),
            None => strip_nulls(incoming_value),
        };
        base.insert(key, merged);
    }
}

/// Drop null-valued keys from every mapping in the tree.
///
/// Equivalent to merging `value` into an empty mapping. List elements are
/// left as they are.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Merge multiple documents in order, with later documents taking precedence.
///
/// Equivalent to folding `deep_merge` over the list, starting from an empty
/// mapping.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values
        .into_iter()
        .fold(Value::Object(Map::new()), deep_merge)
}

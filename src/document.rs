//! The schema-less configuration document and its well-known keys.

use serde_json::{Map, Value};

/// A configuration tree at any stage of resolution.
pub type Document = Value;

pub const BOXEN: &str = "Boxen";
pub const PROFILES: &str = "Profiles";
pub const PARAMETERS: &str = "Parameters";
pub const RESOURCES: &str = "Resources";
pub const MAPPINGS: &str = "Mappings";
pub const OUTPUTS: &str = "Outputs";
pub const DESCRIPTION: &str = "Description";
pub const FORMAT_VERSION: &str = "AWSTemplateFormatVersion";
pub const BOXEN_VERSION: &str = "AWSBoxenVersion";

/// Top-level keys that survive upgrade and default-filling.
///
/// Union of every key ever recognized at the top level, so documents written
/// for any earlier layout keep their metadata.
pub const CANONICAL_KEYS: &[&str] = &[
    BOXEN,
    PROFILES,
    PARAMETERS,
    RESOURCES,
    MAPPINGS,
    OUTPUTS,
    DESCRIPTION,
    FORMAT_VERSION,
    BOXEN_VERSION,
];

/// Name of the box that legacy top-level keys are folded into.
pub const DEFAULT_BOX: &str = "Default";

/// Box kind built by running a provisioning script over SSH.
pub const KIND_BUILD_SCRIPT: &str = "Boxen::BuildScript";

/// Box kind delegated to an external deployment helper.
pub const KIND_HELPER: &str = "Boxen::Helper";

pub fn is_canonical_key(key: &str) -> bool {
    CANONICAL_KEYS.contains(&key)
}

/// An empty mapping document.
pub fn empty() -> Document {
    Value::Object(Map::new())
}

/// Get the mapping stored under `key`, inserting an empty one if the key is
/// missing or holds a non-mapping value.
pub fn ensure_object<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = map.entry(key.to_string()).or_insert_with(empty);
    if !slot.is_object() {
        *slot = empty();
    }
    match slot {
        Value::Object(inner) => inner,
        _ => unreachable!("slot was just replaced with an object"),
    }
}

/// Whether a value counts as "nothing" once merging is done.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Whether a document carries no content (null or an empty mapping).
pub fn is_empty_document(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Declared box names, sorted.
pub fn box_names(doc: &Document) -> Vec<String> {
    doc.get(BOXEN)
        .and_then(Value::as_object)
        .map(|boxen| boxen.keys().cloned().collect())
        .unwrap_or_default()
}

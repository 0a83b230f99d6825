//! Promotion of legacy shorthand documents to the multi-box schema.
//!
//! Older projects declared a single box with all of its settings at the top
//! level (`{processes: ["server.js"]}`). Those keys are swept into the
//! properties of the `Default` box. Box declarations without a `Type` get
//! the plain build kind.
//!
//! Profile overlays go through [`upgrade_overlay`], which normalizes the
//! same shapes but never assigns a kind: an overlay that only adjusts
//! properties must not replace the kind its base declared.

use crate::config::deep_merge;
use crate::document::{
    BOXEN, DEFAULT_BOX, Document, KIND_BUILD_SCRIPT, ensure_object, is_canonical_key,
};
use crate::error::{BoxenError, Result};
use serde_json::{Map, Value, json};
use tracing::debug;

const TYPE: &str = "Type";
const PROPERTIES: &str = "Properties";

/// Upgrade a root document in place. Applying it twice changes nothing further.
///
/// Fails when legacy keys need folding into a `Default` box whose
/// `Properties` is not a mapping.
pub fn upgrade(doc: &mut Document) -> Result<()> {
    upgrade_with(doc, Some(KIND_BUILD_SCRIPT))
}

/// Upgrade a profile overlay in place, leaving box kinds to the base.
pub fn upgrade_overlay(doc: &mut Document) -> Result<()> {
    upgrade_with(doc, None)
}

fn upgrade_with(doc: &mut Document, default_kind: Option<&str>) -> Result<()> {
    let Some(root) = doc.as_object_mut() else {
        return Ok(());
    };

    if let Some(Value::Object(boxen)) = root.get_mut(BOXEN) {
        for (name, declaration) in boxen.iter_mut() {
            if upgrade_declaration(declaration, default_kind) {
                debug!(name = %name, "Upgraded box declaration without Type");
            }
        }
    }

    let legacy = sweep_legacy_keys(root);
    if legacy.is_empty() {
        return Ok(());
    }
    debug!(
        keys = ?legacy.keys().collect::<Vec<_>>(),
        "Folding legacy top-level keys into the default box"
    );

    let boxen = ensure_object(root, BOXEN);
    let declaration = boxen
        .entry(DEFAULT_BOX.to_string())
        .or_insert(Value::Null);
    if !declaration.is_object() {
        *declaration = match default_kind {
            Some(kind) => json!({ TYPE: kind }),
            None => json!({}),
        };
    }
    let Some(declaration) = declaration.as_object_mut() else {
        return Ok(());
    };

    // Explicit properties win over swept-up legacy keys
    let properties = match declaration.remove(PROPERTIES) {
        None | Some(Value::Null) => Value::Object(legacy),
        Some(explicit @ Value::Object(_)) => deep_merge(Value::Object(legacy), explicit),
        Some(explicit) => {
            let keys: Vec<&str> = legacy.keys().map(String::as_str).collect();
            let message = format!(
                "legacy keys {} need a mapping to fold into, found {explicit}",
                keys.join(", ")
            );
            declaration.insert(PROPERTIES.to_string(), explicit);
            return Err(BoxenError::parse(
                format!("{BOXEN}.{DEFAULT_BOX}.{PROPERTIES}"),
                message,
            ));
        }
    };
    declaration.insert(PROPERTIES.to_string(), properties);
    Ok(())
}

/// Give a box declaration a `Type`, wrapping bare values as its properties.
///
/// With no `default_kind` only the wrapping happens. Null declarations are
/// deletion markers and stay untouched. Returns whether anything changed.
fn upgrade_declaration(declaration: &mut Value, default_kind: Option<&str>) -> bool {
    if declaration.is_null() {
        return false;
    }
    if declaration.get(TYPE).is_some() {
        return false;
    }

    let needs_wrap = match declaration {
        Value::Object(map) => !map.contains_key(PROPERTIES),
        _ => true,
    };
    if needs_wrap {
        let legacy = declaration.take();
        *declaration = json!({ PROPERTIES: legacy });
    }
    if let (Some(kind), Value::Object(map)) = (default_kind, &mut *declaration) {
        map.insert(TYPE.to_string(), Value::String(kind.to_string()));
    }
    needs_wrap || default_kind.is_some()
}

/// Remove and return every non-canonical top-level key.
fn sweep_legacy_keys(root: &mut Map<String, Value>) -> Map<String, Value> {
    let legacy_keys: Vec<String> = root
        .keys()
        .filter(|key| !is_canonical_key(key))
        .cloned()
        .collect();

    legacy_keys
        .into_iter()
        .filter_map(|key| root.remove(&key).map(|value| (key, value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_legacy_document() {
        let mut doc = json!({"processes": ["server.js"], "Description": "app"});
        upgrade(&mut doc).unwrap();
        assert_eq!(
            doc,
            json!({
                "Description": "app",
                "Boxen": {
                    "Default": {
                        "Type": "Boxen::BuildScript",
                        "Properties": {"processes": ["server.js"]}
                    }
                }
            })
        );
    }

    #[test]
    fn test_box_without_type_or_properties_is_wrapped() {
        let mut doc = json!({"Boxen": {"Web": {"processes": ["web.js"]}}});
        upgrade(&mut doc).unwrap();
        assert_eq!(
            doc["Boxen"]["Web"],
            json!({"Type": "Boxen::BuildScript", "Properties": {"processes": ["web.js"]}})
        );
    }

    #[test]
    fn test_box_with_properties_only_gets_type() {
        let mut doc = json!({"Boxen": {"Web": {"Properties": {"a": 1}, "DependsOn": "Db"}}});
        upgrade(&mut doc).unwrap();
        assert_eq!(
            doc["Boxen"]["Web"],
            json!({"Type": "Boxen::BuildScript", "Properties": {"a": 1}, "DependsOn": "Db"})
        );
    }

    #[test]
    fn test_typed_box_is_untouched() {
        let mut doc = json!({"Boxen": {"Web": {"Type": "Boxen::Helper", "stuff": 1}}});
        let before = doc.clone();
        upgrade(&mut doc).unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn test_null_box_marker_is_untouched() {
        let mut doc = json!({"Boxen": {"Web": null}});
        upgrade(&mut doc).unwrap();
        assert_eq!(doc, json!({"Boxen": {"Web": null}}));
    }

    #[test]
    fn test_explicit_default_properties_win() {
        let mut doc = json!({
            "port": 80,
            "name": "legacy",
            "Boxen": {"Default": {"Type": "Boxen::Helper", "Properties": {"port": 8080}}}
        });
        upgrade(&mut doc).unwrap();
        assert_eq!(
            doc["Boxen"]["Default"],
            json!({"Type": "Boxen::Helper", "Properties": {"port": 8080, "name": "legacy"}})
        );
    }

    #[test]
    fn test_upgrade_is_idempotent() {
        let mut once = json!({
            "processes": ["server.js"],
            "Boxen": {"Worker": {"queue": "jobs"}, "Default": {"env": "x"}},
            "Resources": {}
        });
        upgrade(&mut once).unwrap();
        let mut twice = once.clone();
        upgrade(&mut twice).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_canonical_keys_stay_top_level() {
        let mut doc = json!({
            "Parameters": {}, "Resources": {}, "Mappings": {}, "Outputs": {},
            "Description": "d", "AWSTemplateFormatVersion": "2010-09-09",
            "AWSBoxenVersion": ">=0.3", "Profiles": {}
        });
        let before = doc.clone();
        upgrade(&mut doc).unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn test_overlay_legacy_keys_add_only_properties() {
        let mut overlay = json!({"instanceCount": 3});
        upgrade_overlay(&mut overlay).unwrap();
        assert_eq!(
            overlay,
            json!({"Boxen": {"Default": {"Properties": {"instanceCount": 3}}}})
        );
    }

    #[test]
    fn test_overlay_boxes_are_wrapped_without_kind() {
        let mut overlay = json!({"Boxen": {"Web": {"processes": ["web.js"]}, "Db": {"Type": "Boxen::Helper"}}});
        upgrade_overlay(&mut overlay).unwrap();
        assert_eq!(
            overlay["Boxen"],
            json!({
                "Web": {"Properties": {"processes": ["web.js"]}},
                "Db": {"Type": "Boxen::Helper"}
            })
        );
    }

    #[test]
    fn test_overlay_upgrade_is_idempotent() {
        let mut once = json!({"port": 80, "Boxen": {"Worker": {"queue": "jobs"}}});
        upgrade_overlay(&mut once).unwrap();
        let mut twice = once.clone();
        upgrade_overlay(&mut twice).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_legacy_keys_with_scalar_default_properties_fail() {
        let mut doc = json!({"processes": ["server.js"], "Boxen": {"Default": "web"}});
        let err = upgrade(&mut doc).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ParseError);
        assert!(err.to_string().contains("processes"));
    }
}

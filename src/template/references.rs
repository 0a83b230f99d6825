//! Reference resolution over a filled document.
//!
//! Three passes run in a fixed order, each over the whole tree:
//! 1. `{"Ref": name}` nodes
//! 2. `{"Fn::FindInMap": [map, top, second]}` nodes
//! 3. custom function nodes from a [`FunctionRegistry`]
//!
//! References and lookups that cannot be resolved here are left in place;
//! the orchestration service resolves them at deploy time.

use super::functions::FunctionRegistry;
use crate::document::{Document, MAPPINGS, PARAMETERS};
use crate::error::Result;
use serde_json::{Map, Value};
use tracing::{debug, trace};

pub const REF: &str = "Ref";
pub const FIND_IN_MAP: &str = "Fn::FindInMap";
pub const PSEUDO_REGION: &str = "AWS::Region";
pub const PSEUDO_STACK_NAME: &str = "AWS::StackName";

/// Values references are resolved against, besides the document itself.
#[derive(Debug, Clone, Default)]
pub struct ReferenceContext {
    /// Parameter overrides from parameter files and definitions.
    pub overrides: Map<String, Value>,
    pub region: String,
    pub stack_name: String,
}

/// Rebuild `value` bottom-up, replacing every node with `f(node)`.
///
/// Children (mapping values and list elements) are visited before their
/// parent, so `f` always sees an already-rewritten subtree.
pub fn transform<F>(value: Value, f: &mut F) -> Result<Value>
where
    F: FnMut(Value) -> Result<Value>,
{
    let rebuilt = match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, child) in map {
                out.insert(key, transform(child, f)?);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|child| transform(child, f))
                .collect::<Result<Vec<_>>>()?,
        ),
        scalar => scalar,
    };
    f(rebuilt)
}

/// The single `(key, value)` pair of a one-key mapping.
fn single_entry(value: &Value) -> Option<(&str, &Value)> {
    match value {
        Value::Object(map) if map.len() == 1 => map.iter().next().map(|(k, v)| (k.as_str(), v)),
        _ => None,
    }
}

/// Resolve every reference, lookup and function call in `doc`.
pub fn resolve_references(
    doc: Document,
    ctx: &ReferenceContext,
    registry: &FunctionRegistry,
) -> Result<Document> {
    let doc = resolve_refs(doc, ctx)?;
    let doc = resolve_lookups(doc)?;
    apply_functions(doc, registry)
}

fn resolve_refs(doc: Document, ctx: &ReferenceContext) -> Result<Document> {
    let defaults: Map<String, Value> = doc
        .get(PARAMETERS)
        .and_then(Value::as_object)
        .map(|parameters| {
            parameters
                .iter()
                .filter_map(|(name, p)| p.get("Default").map(|d| (name.clone(), d.clone())))
                .collect()
        })
        .unwrap_or_default();

    let mut resolved = 0usize;
    let doc = transform(doc, &mut |node| {
        let Some((REF, Value::String(name))) = single_entry(&node) else {
            return Ok(node);
        };
        let value = ctx
            .overrides
            .get(name)
            .or_else(|| defaults.get(name))
            .cloned()
            .or_else(|| match name.as_str() {
                PSEUDO_REGION => Some(Value::String(ctx.region.clone())),
                PSEUDO_STACK_NAME => Some(Value::String(ctx.stack_name.clone())),
                _ => None,
            });
        match value {
            Some(value) => {
                resolved += 1;
                Ok(value)
            }
            None => {
                trace!(name = %name, "Leaving unresolved reference");
                Ok(node)
            }
        }
    })?;
    debug!(resolved, "Resolved references");
    Ok(doc)
}

fn resolve_lookups(doc: Document) -> Result<Document> {
    let mappings = doc.get(MAPPINGS).cloned().unwrap_or(Value::Null);

    let mut resolved = 0usize;
    let doc = transform(doc, &mut |node| {
        let Some((FIND_IN_MAP, argument)) = single_entry(&node) else {
            return Ok(node);
        };
        match find_in_map(&mappings, argument) {
            Some(value) => {
                resolved += 1;
                Ok(value)
            }
            None => {
                trace!(lookup = %argument, "Leaving unresolved map lookup");
                Ok(node)
            }
        }
    })?;
    debug!(resolved, "Resolved map lookups");
    Ok(doc)
}

fn find_in_map(mappings: &Value, argument: &Value) -> Option<Value> {
    let [map, top, second] = argument.as_array()?.as_slice() else {
        return None;
    };
    mappings
        .get(map.as_str()?)?
        .get(top.as_str()?)?
        .get(second.as_str()?)
        .cloned()
}

fn apply_functions(doc: Document, registry: &FunctionRegistry) -> Result<Document> {
    if registry.is_empty() {
        return Ok(doc);
    }
    transform(doc, &mut |node| {
        let Some((key, argument)) = single_entry(&node) else {
            return Ok(node);
        };
        let Some(function) = registry.get(key) else {
            return Ok(node);
        };
        debug!(function = function.name(), "Applying template function");
        function.apply(argument)
    })
}

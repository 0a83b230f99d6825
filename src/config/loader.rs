//! Layered configuration loading.
//!
//! A path is either a single file, decoded according to its extension, or a
//! directory whose children become keys of a mapping. Directory children
//! are visited in sorted order so that name prefixes (`10-base.yaml`,
//! `20-overrides.yaml`) control merge precedence.

use super::format::{ConfigFormat, base_name};
use super::merge::deep_merge;
use crate::document::{Document, is_empty_document};
use crate::error::{BoxenError, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Load a file or directory tree into a single document.
pub fn load(path: &Path) -> Result<Document> {
    let metadata = std::fs::metadata(path).map_err(|e| BoxenError::io(path, e))?;
    if metadata.is_dir() {
        load_dir(path)
    } else {
        load_file(path)
    }
}

/// Load a single file, dispatching on its extension.
pub fn load_file(path: &Path) -> Result<Document> {
    let format =
        ConfigFormat::from_path(path).ok_or_else(|| BoxenError::UnrecognizedFormat(path.into()))?;
    let content = std::fs::read_to_string(path).map_err(|e| BoxenError::io(path, e))?;
    debug!(path = %path.display(), %format, "Loading config file");
    format.parse(&content, path)
}

/// Load every child of a directory into a mapping keyed by base name.
///
/// Children sharing a base name (`Resources.json` and `Resources/`) are deep
/// merged in sort order. Children that produce an empty document are
/// skipped so empty directories do not leave keys behind.
fn load_dir(dir: &Path) -> Result<Document> {
    let mut merged = Map::new();

    for (name, path) in sorted_children(dir)? {
        let child = load(&path)?;
        if is_empty_document(&child) {
            trace!(path = %path.display(), "Skipping empty config entry");
            continue;
        }

        let key = if path.is_dir() {
            name.as_str()
        } else {
            base_name(&name)
        };
        let value = match merged.remove(key) {
            Some(existing) => deep_merge(existing, child),
            None => child,
        };
        merged.insert(key.to_string(), value);
    }

    Ok(Value::Object(merged))
}

/// Non-hidden children of `dir`, sorted by file name.
pub(crate) fn sorted_children(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(dir).map_err(|e| BoxenError::io(dir, e))?;

    let mut children = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BoxenError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        children.push((name, entry.path()));
    }
    children.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(children)
}

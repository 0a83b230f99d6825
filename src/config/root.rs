//! Root configuration discovery.
//!
//! The root document is either discovered in a project directory by base
//! name, or assembled from an explicit ordered list of paths.

use super::format::base_name;
use super::loader::{load, sorted_children};
use super::merge::deep_merge;
use crate::document::{Document, empty};
use crate::error::{BoxenError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Base names searched for when no explicit config is given.
///
/// The first is the current name; the others are accepted for older
/// projects.
pub const DEFAULT_ROOT_NAMES: &[&str] = &["boxen", "aws-boxen", "awsboxen"];

/// Where the root configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSource {
    /// Search a project directory for entries named after a root base name.
    Search(PathBuf),
    /// Load these paths in order; later paths override earlier ones.
    Explicit(Vec<PathBuf>),
}

/// Load and merge the root configuration.
pub fn load_root<S: AsRef<str>>(source: &RootSource, base_names: &[S]) -> Result<Document> {
    let paths = match source {
        RootSource::Search(dir) => discover(dir, base_names)?,
        RootSource::Explicit(paths) => paths.clone(),
    };

    let mut root = empty();
    for path in &paths {
        let doc = load(path)?;
        if doc.is_null() {
            debug!(path = %path.display(), "Root config is empty");
            continue;
        }
        root = deep_merge(root, doc);
    }

    if !root.is_object() {
        let last = paths.last().cloned().unwrap_or_default();
        return Err(BoxenError::parse(last, "root config must be a mapping"));
    }

    info!(files = paths.len(), "Loaded root config");
    Ok(root)
}

/// Entries of `dir` whose base name is one of `base_names`, sorted.
fn discover<S: AsRef<str>>(dir: &Path, base_names: &[S]) -> Result<Vec<PathBuf>> {
    let found: Vec<PathBuf> = sorted_children(dir)?
        .into_iter()
        .filter(|(name, path)| {
            let base = if path.is_dir() { name.as_str() } else { base_name(name) };
            base_names.iter().any(|candidate| candidate.as_ref() == base)
        })
        .map(|(_, path)| path)
        .collect();

    if found.is_empty() {
        return Err(BoxenError::NoConfigFound {
            dir: dir.to_path_buf(),
            names: base_names.iter().map(|n| n.as_ref().to_string()).collect(),
        });
    }

    debug!(dir = %dir.display(), count = found.len(), "Discovered root config entries");
    Ok(found)
}

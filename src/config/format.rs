//! Serialization formats recognized for configuration files.

use crate::document::Document;
use crate::error::{BoxenError, Result};
use serde_json::Value;
use std::path::Path;

/// Serialization format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML, decoded strictly (duplicate keys and custom tags are rejected).
    Yaml,
    /// JSON.
    Json,
}

impl ConfigFormat {
    /// Determine the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    /// Determine the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Decode `content`; `path` is only used for error reporting.
    pub fn parse(self, content: &str, path: &Path) -> Result<Document> {
        if self.is_blank(content) {
            return Ok(Value::Null);
        }
        match self {
            ConfigFormat::Yaml => {
                let yaml = serde_yaml::from_str::<serde_yaml::Value>(content)
                    .map_err(|e| BoxenError::parse(path, e))?;
                yaml_to_document(yaml).map_err(|message| BoxenError::parse(path, message))
            }
            ConfigFormat::Json => {
                serde_json::from_str::<Value>(content).map_err(|e| BoxenError::parse(path, e))
            }
        }
    }

    /// Whether `content` holds no document: whitespace only, plus `#`
    /// comment lines for YAML.
    fn is_blank(self, content: &str) -> bool {
        let mut lines = content.lines().map(str::trim);
        match self {
            ConfigFormat::Yaml => lines.all(|line| line.is_empty() || line.starts_with('#')),
            ConfigFormat::Json => lines.all(str::is_empty),
        }
    }
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigFormat::Yaml => write!(f, "yaml"),
            ConfigFormat::Json => write!(f, "json"),
        }
    }
}

/// Convert a decoded YAML tree, rejecting anything without a plain JSON shape.
///
/// Decoding through `serde_yaml::Value` first is what rejects duplicate keys.
fn yaml_to_document(yaml: serde_yaml::Value) -> std::result::Result<Document, String> {
    use serde_yaml::Value as Yaml;

    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("unsupported number {n}"))?
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_document)
                .collect::<std::result::Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = serde_json::Map::new();
            for (key, value) in mapping {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported mapping key {other:?}")),
                };
                map.insert(key, yaml_to_document(value)?);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => return Err(format!("unsupported tag {}", tagged.tag)),
    })
}

/// Base name of a directory entry: the file name with a recognized
/// extension stripped, or the bare name otherwise.
pub fn base_name(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ConfigFormat::from_extension(ext).is_some() => {
            stem
        }
        _ => file_name,
    }
}

//! Parameter override sources: parameter files and `key=value` definitions.

use crate::config::{ConfigFormat, load};
use crate::error::{BoxenError, Result};
use crate::providers::Decryptor;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// First line of an ASCII-armored PGP message.
pub const ARMOR_HEADER: &str = "-----BEGIN PGP MESSAGE-----";

/// Extensions added by encryption, stripped before picking a format.
const ENCRYPTED_EXTENSIONS: &[&str] = &["asc", "gpg"];

/// Load one parameter file as a flat mapping of overrides.
///
/// Armored files are decrypted first and parsed by the extension left after
/// stripping `.asc` or `.gpg` (`secrets.yaml.asc` is YAML). An empty file
/// contributes nothing.
pub fn load_parameter_file(path: &Path, decryptor: &dyn Decryptor) -> Result<Map<String, Value>> {
    let doc = if is_armored(path)? {
        let plaintext = decryptor.decrypt(path)?;
        let content = String::from_utf8(plaintext).map_err(|e| BoxenError::DecryptionFailed {
            path: path.to_path_buf(),
            details: format!("plaintext is not UTF-8: {e}"),
        })?;
        let inner = decrypted_name(path);
        let format = ConfigFormat::from_path(&inner)
            .ok_or_else(|| BoxenError::UnrecognizedFormat(inner.clone()))?;
        debug!(path = %path.display(), %format, "Parsing decrypted parameter file");
        format.parse(&content, path)?
    } else {
        load(path)?
    };

    match doc {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        _ => Err(BoxenError::parse(path, "parameter file must be a mapping")),
    }
}

fn is_armored(path: &Path) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    let bytes = std::fs::read(path).map_err(|e| BoxenError::io(path, e))?;
    Ok(bytes.trim_ascii_start().starts_with(ARMOR_HEADER.as_bytes()))
}

/// `secrets.json.asc` -> `secrets.json`.
fn decrypted_name(path: &Path) -> PathBuf {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ENCRYPTED_EXTENSIONS.contains(&ext) => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}

/// Parse `key=value[,key=value...]`, splitting each pair on its first `=`.
pub fn parse_definitions(definitions: &str) -> Result<Map<String, Value>> {
    let mut parameters = Map::new();
    for definition in definitions.split(',').filter(|d| !d.trim().is_empty()) {
        let Some((key, value)) = definition.split_once('=') else {
            return Err(BoxenError::InvalidParameterDefinition(definition.to_string()));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(BoxenError::InvalidParameterDefinition(definition.to_string()));
        }
        parameters.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(parameters)
}

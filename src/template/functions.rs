//! Custom template functions applied during reference resolution.
//!
//! A function node is a single-key mapping whose key is a registered
//! function name, e.g. `{"Boxen::BootScript": {...}}`. The node is replaced
//! by the function's result.

use crate::error::{BoxenError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::Write;

/// A pure function over template values.
pub trait TemplateFunction: Send + Sync {
    /// Key that marks a node as a call to this function.
    fn name(&self) -> &'static str;

    /// Compute the replacement for a node whose argument is `argument`.
    fn apply(&self, argument: &Value) -> Result<Value>;
}

/// Registered template functions, keyed by name.
pub struct FunctionRegistry {
    functions: BTreeMap<&'static str, Box<dyn TemplateFunction>>,
}

impl FunctionRegistry {
    /// A registry without any functions.
    pub fn empty() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }

    /// A registry with the built-in functions.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(BootScript);
        registry
    }

    pub fn register(&mut self, function: impl TemplateFunction + 'static) {
        self.functions.insert(function.name(), Box::new(function));
    }

    pub fn get(&self, name: &str) -> Option<&dyn TemplateFunction> {
        self.functions.get(name).map(|f| f.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// `Boxen::BootScript`: a compressed shell script for instance user data.
///
/// ```yaml
/// UserData:
///   Boxen::BootScript:
///     Files:
///       /etc/app/env: "PORT=80\n"
///     Run:
///       - systemctl restart app
/// ```
///
/// The result is the base64 encoding of a gzip-compressed script that
/// writes every file and then runs every command, which cloud-init accepts
/// as-is.
pub struct BootScript;

impl BootScript {
    pub const NAME: &'static str = "Boxen::BootScript";

    /// Render the uncompressed script.
    pub fn render(files: &Map<String, Value>, run: &[String]) -> Result<String> {
        let mut script = String::from("#!/bin/sh\nset -e\n");

        for (path, content) in files {
            let content = content.as_str().ok_or_else(|| {
                BoxenError::invalid_argument(Self::NAME, format!("Files.{path} must be a string"))
            })?;
            if path.is_empty() || path.contains('\'') {
                return Err(BoxenError::invalid_argument(
                    Self::NAME,
                    format!("unsupported file path '{path}'"),
                ));
            }
            let marker = heredoc_marker(content);
            match path.rsplit_once('/') {
                Some((dir, _)) if !dir.is_empty() => {
                    script.push_str(&format!("mkdir -p '{dir}'\n"));
                }
                _ => {}
            }
            script.push_str(&format!("cat > '{path}' <<'{marker}'\n{content}"));
            if !content.ends_with('\n') {
                script.push('\n');
            }
            script.push_str(&format!("{marker}\n"));
        }

        for command in run {
            script.push_str(command);
            script.push('\n');
        }

        Ok(script)
    }
}

impl TemplateFunction for BootScript {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, argument: &Value) -> Result<Value> {
        let Value::Object(argument) = argument else {
            return Err(BoxenError::invalid_argument(Self::NAME, "expected a mapping"));
        };
        if let Some(unknown) = argument.keys().find(|k| *k != "Files" && *k != "Run") {
            return Err(BoxenError::invalid_argument(
                Self::NAME,
                format!("unknown key '{unknown}'"),
            ));
        }

        let empty = Map::new();
        let files = match argument.get("Files") {
            None => &empty,
            Some(Value::Object(files)) => files,
            Some(_) => {
                return Err(BoxenError::invalid_argument(Self::NAME, "Files must be a mapping"));
            }
        };
        let run = match argument.get("Run") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        BoxenError::invalid_argument(Self::NAME, "Run entries must be strings")
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => {
                return Err(BoxenError::invalid_argument(Self::NAME, "Run must be a list"));
            }
        };
        if files.is_empty() && run.is_empty() {
            return Err(BoxenError::invalid_argument(Self::NAME, "nothing to write or run"));
        }

        let script = Self::render(files, &run)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(script.as_bytes())
            .and_then(|_| encoder.finish())
            .map(|compressed| Value::String(STANDARD.encode(compressed)))
            .map_err(|e| BoxenError::invalid_argument(Self::NAME, e.to_string()))
    }
}

/// A heredoc terminator that does not occur as a line of `content`.
fn heredoc_marker(content: &str) -> String {
    let mut marker = "BOXEN_EOF".to_string();
    let mut n = 0;
    while content.lines().any(|line| line == marker) {
        n += 1;
        marker = format!("BOXEN_EOF_{n}");
    }
    marker
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use flate2::read::GzDecoder;
    use serde_json::json;
    use std::io::Read;

    fn decode(value: &Value) -> String {
        let compressed = STANDARD.decode(value.as_str().unwrap()).unwrap();
        let mut script = String::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_string(&mut script)
            .unwrap();
        script
    }

    #[test]
    fn test_boot_script_writes_files_then_runs() {
        let result = BootScript
            .apply(&json!({
                "Files": {"/etc/app/env": "PORT=80\n"},
                "Run": ["systemctl restart app"]
            }))
            .unwrap();

        assert_eq!(
            decode(&result),
            "#!/bin/sh\nset -e\n\
             mkdir -p '/etc/app'\n\
             cat > '/etc/app/env' <<'BOXEN_EOF'\nPORT=80\nBOXEN_EOF\n\
             systemctl restart app\n"
        );
    }

    #[test]
    fn test_marker_avoids_content_lines() {
        let mut files = Map::new();
        files.insert("notes".to_string(), json!("BOXEN_EOF\nmore"));
        let script = BootScript::render(&files, &[]).unwrap();
        assert!(script.contains("<<'BOXEN_EOF_1'\nBOXEN_EOF\nmore\nBOXEN_EOF_1\n"));
        assert!(!script.contains("mkdir"));
    }

    #[test]
    fn test_boot_script_rejects_bad_arguments() {
        for argument in [
            json!("script"),
            json!({}),
            json!({"Files": ["a"]}),
            json!({"Files": {"/a": 1}}),
            json!({"Run": "ls"}),
            json!({"Run": [1]}),
            json!({"Run": ["ls"], "Extra": true}),
        ] {
            let err = BootScript.apply(&argument).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidFunctionArgument, "{argument}");
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = FunctionRegistry::with_builtins();
        assert!(registry.get("Boxen::BootScript").is_some());
        assert!(registry.get("Fn::Join").is_none());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Boxen::BootScript"]);
        assert!(FunctionRegistry::empty().is_empty());
    }
}

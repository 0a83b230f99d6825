//! Command-line options resolution.
//!
//! Raw options arrive from several front ends under different spellings
//! (`--stack-name`, `<stack-name>`, `stack_name`, `stackName`). They are
//! normalized to one snake_case mapping, then resolved against the
//! environment and tool settings into [`Options`].

mod params;

pub use params::{ARMOR_HEADER, load_parameter_file, parse_definitions};

use crate::config::Settings;
use crate::context::ProjectContext;
use crate::error::{BoxenError, Result};
use crate::providers::Decryptor;
use crate::template::DEFAULT_PROFILE;
use heck::ToSnakeCase;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Region used when nothing else names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Where a raw key came from. Lower variants win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Spelling {
    Flag,
    Positional,
    Bare,
}

/// Classify and normalize a raw key.
fn normalize_key(raw: &str) -> (String, Spelling) {
    let spelling = if raw.starts_with('-') {
        Spelling::Flag
    } else if raw.starts_with('<') && raw.ends_with('>') {
        Spelling::Positional
    } else {
        Spelling::Bare
    };
    (raw.to_snake_case(), spelling)
}

/// Unresolved options, keyed however the front end spells them.
#[derive(Debug, Clone, Default)]
pub struct RawOptions {
    entries: Vec<(String, Value)>,
}

impl RawOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key`; `null` and `false` count as not given.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.entries.push((key.to_string(), value.into()));
    }

    /// One value per snake_case key. A flag beats a positional, which beats
    /// a bare key; among equal spellings the first wins.
    pub fn normalize(&self) -> Map<String, Value> {
        let mut chosen: BTreeMap<String, (Spelling, &Value)> = BTreeMap::new();
        for (raw, value) in &self.entries {
            if matches!(value, Value::Null | Value::Bool(false)) {
                continue;
            }
            let (key, spelling) = normalize_key(raw);
            match chosen.get(&key) {
                Some((existing, _)) if *existing <= spelling => {}
                _ => {
                    chosen.insert(key, (spelling, value));
                }
            }
        }
        chosen
            .into_iter()
            .map(|(key, (_, value))| (key, value.clone()))
            .collect()
    }
}

impl From<Map<String, Value>> for RawOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            entries: map.into_iter().collect(),
        }
    }
}

/// Whether resolution must produce cloud credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialPolicy {
    Required,
    Optional,
}

/// Cloud API credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Fully resolved options.
#[derive(Debug, Clone)]
pub struct Options {
    pub region: String,
    pub profile: String,
    pub stack_name: String,
    /// Explicit root config paths; empty means search the project root.
    pub config_paths: Vec<PathBuf>,
    /// Selected boxen; empty means all of them.
    pub boxen: Vec<String>,
    /// Parameter overrides, later sources already applied over earlier ones.
    pub parameters: Map<String, Value>,
    pub credentials: Option<Credentials>,
}

/// Resolve raw options against the environment and settings.
pub fn resolve_options(
    raw: &RawOptions,
    ctx: &ProjectContext,
    settings: &Settings,
    decryptor: &dyn Decryptor,
    policy: CredentialPolicy,
) -> Result<Options> {
    let values = raw.normalize();

    let credentials = resolve_credentials(&values, ctx, policy)?;

    let region = string(&values, "region")
        .or_else(|| settings.region.clone())
        .or_else(|| ctx.env("AWS_DEFAULT_REGION").map(str::to_string))
        .or_else(|| ctx.env("AWS_REGION").map(str::to_string))
        .unwrap_or_else(|| DEFAULT_REGION.to_string());

    let profile = string(&values, "profile")
        .or_else(|| settings.profile.clone())
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string());

    let stack_name = string(&values, "stack_name").unwrap_or_else(|| ctx.project_name());

    let config_paths = list(&values, "config")
        .into_iter()
        .map(|path| ctx.resolve_path(path))
        .collect();

    let boxen = list(&values, "boxen");

    let mut parameters = Map::new();
    for entry in list(&values, "params_file") {
        for path in entry.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let path = ctx.resolve_path(path);
            let loaded = load_parameter_file(&path, decryptor)?;
            debug!(path = %path.display(), count = loaded.len(), "Loaded parameter file");
            parameters.extend(loaded);
        }
    }
    for entry in list(&values, "define") {
        parameters.extend(parse_definitions(&entry)?);
    }

    debug!(
        %region,
        %profile,
        %stack_name,
        parameters = parameters.len(),
        "Resolved options"
    );

    Ok(Options {
        region,
        profile,
        stack_name,
        config_paths,
        boxen,
        parameters,
        credentials,
    })
}

fn resolve_credentials(
    values: &Map<String, Value>,
    ctx: &ProjectContext,
    policy: CredentialPolicy,
) -> Result<Option<Credentials>> {
    const KEY: (&str, &str) = ("access-key-id", "AWS_ACCESS_KEY_ID");
    const SECRET: (&str, &str) = ("secret-access-key", "AWS_SECRET_ACCESS_KEY");

    let lookup = |(option, env): (&str, &str)| {
        string(values, &option.to_snake_case()).or_else(|| ctx.env(env).map(str::to_string))
    };

    match (lookup(KEY), lookup(SECRET), policy) {
        (Some(access_key_id), Some(secret_access_key), _) => Ok(Some(Credentials {
            access_key_id,
            secret_access_key,
        })),
        (_, _, CredentialPolicy::Optional) => Ok(None),
        (None, _, CredentialPolicy::Required) => Err(BoxenError::MissingCredential {
            option: KEY.0,
            env: KEY.1,
        }),
        (_, None, CredentialPolicy::Required) => Err(BoxenError::MissingCredential {
            option: SECRET.0,
            env: SECRET.1,
        }),
    }
}

/// A scalar option as a string.
fn string(values: &Map<String, Value>, key: &str) -> Option<String> {
    match values.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A string-or-list option as a list.
fn list(values: &Map<String, Value>, key: &str) -> Vec<String> {
    match values.get(key) {
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

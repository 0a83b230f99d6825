//! Tool settings with tier-based merging.
//!
//! Settings are defaults for the command line, not part of the deployed
//! template. Tiers, lowest to highest priority:
//! 1. **Defaults** - built in
//! 2. **User** - `~/.boxen/config.yaml` (or `$BOXEN_USER_DIR/config.yaml`)
//! 3. **Project** - `.boxen.yaml` in the project root
//! 4. **Environment** - `BOXEN_REGION`, `BOXEN_PROFILE`, `BOXEN_SSH_KEY`, `BOXEN_GPG`

use super::format::ConfigFormat;
use super::merge::deep_merge_all;
use super::root::DEFAULT_ROOT_NAMES;
use crate::context::ProjectContext;
use crate::error::{BoxenError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SettingsTier {
    Defaults = 0,
    User = 1,
    Project = 2,
    Environment = 3,
}

impl std::fmt::Display for SettingsTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsTier::Defaults => write!(f, "defaults"),
            SettingsTier::User => write!(f, "user"),
            SettingsTier::Project => write!(f, "project"),
            SettingsTier::Environment => write!(f, "environment"),
        }
    }
}

/// Tool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Region used when none is given on the command line.
    pub region: Option<String>,

    /// Profile used when none is given on the command line.
    pub profile: Option<String>,

    /// Base names searched for the root config.
    pub root_names: Vec<String>,

    /// Public key whose fingerprint becomes the `DeployKey` parameter.
    pub ssh_public_key: Option<PathBuf>,

    /// Program used to decrypt armored parameter files.
    pub gpg_program: String,

    /// Program used to find the current commit.
    pub git_program: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: None,
            profile: None,
            root_names: DEFAULT_ROOT_NAMES.iter().map(|s| s.to_string()).collect(),
            ssh_public_key: None,
            gpg_program: "gpg".to_string(),
            git_program: "git".to_string(),
        }
    }
}

/// Project-level settings file name.
pub const PROJECT_SETTINGS_FILE: &str = ".boxen.yaml";

impl Settings {
    /// Load settings from every tier.
    pub fn load(ctx: &ProjectContext) -> Result<Self> {
        let mut tiers: Vec<Value> = Vec::new();

        if let Ok(defaults) = serde_json::to_value(Settings::default()) {
            tiers.push(defaults);
        }

        if let Some(user_dir) = Self::user_dir(ctx) {
            let path = user_dir.join("config.yaml");
            if let Some(value) = Self::read_tier(&path, SettingsTier::User)? {
                tiers.push(value);
            }
        }

        let project = ctx.root_dir.join(PROJECT_SETTINGS_FILE);
        if let Some(value) = Self::read_tier(&project, SettingsTier::Project)? {
            tiers.push(value);
        }

        let merged = deep_merge_all(tiers);
        let mut settings: Settings = serde_json::from_value(merged)
            .map_err(|e| BoxenError::Settings {
                path: project.clone(),
                message: e.to_string(),
            })?;

        settings.apply_env_overrides(ctx);
        Ok(settings)
    }

    /// User settings directory: `BOXEN_USER_DIR` or `~/.boxen`.
    fn user_dir(ctx: &ProjectContext) -> Option<PathBuf> {
        ctx.env("BOXEN_USER_DIR")
            .map(PathBuf::from)
            .or_else(|| ctx.home_dir().map(|h| h.join(".boxen")))
    }

    fn read_tier(path: &Path, tier: SettingsTier) -> Result<Option<Value>> {
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|e| BoxenError::io(path, e))?;
        let value = ConfigFormat::Yaml
            .parse(&content, path)
            .map_err(|e| BoxenError::Settings {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        debug!(path = %path.display(), %tier, "Loaded settings tier");
        Ok(if value.is_null() { None } else { Some(value) })
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self, ctx: &ProjectContext) {
        if let Some(region) = ctx.env("BOXEN_REGION") {
            self.region = Some(region.to_string());
        }
        if let Some(profile) = ctx.env("BOXEN_PROFILE") {
            self.profile = Some(profile.to_string());
        }
        if let Some(key) = ctx.env("BOXEN_SSH_KEY") {
            self.ssh_public_key = Some(PathBuf::from(key));
        }
        if let Some(gpg) = ctx.env("BOXEN_GPG") {
            self.gpg_program = gpg.to_string();
        }
    }
}

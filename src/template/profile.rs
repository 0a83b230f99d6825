//! Profile overlays.

use crate::config::deep_merge;
use crate::document::{Document, PROFILES};
use crate::error::{BoxenError, Result};
use serde_json::Value;
use tracing::{debug, info};

/// Profile name that may be selected without being declared.
pub const DEFAULT_PROFILE: &str = "default";

/// Merge `Profiles[name]` over the document and drop the profile catalog.
pub fn apply_profile(doc: Document, name: &str) -> Result<Document> {
    let Value::Object(mut root) = doc else {
        return Ok(doc);
    };

    let mut profiles = match root.remove(PROFILES) {
        Some(Value::Object(profiles)) => profiles,
        _ => Default::default(),
    };

    match profiles.remove(name) {
        Some(Value::Null) => {
            debug!(profile = %name, "Profile is empty");
            Ok(Value::Object(root))
        }
        Some(overlay @ Value::Object(_)) => {
            info!(profile = %name, "Applying profile");
            Ok(deep_merge(Value::Object(root), overlay))
        }
        Some(_) => Err(BoxenError::parse(
            format!("{PROFILES}.{name}"),
            "profile must be a mapping",
        )),
        None if name == DEFAULT_PROFILE => {
            debug!("No default profile declared");
            Ok(Value::Object(root))
        }
        None => Err(BoxenError::UnknownProfile {
            name: name.to_string(),
            available: profiles.keys().cloned().collect(),
        }),
    }
}

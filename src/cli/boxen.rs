//! Boxen subcommand: list declared boxen.

use super::Session;
use crate::document::BOXEN;
use crate::error::{BoxenError, Result};
use crate::options::{CredentialPolicy, RawOptions};
use crate::template::overlay;
use clap::Args;
use serde_json::Value;
use std::io::Write;

/// Arguments for the boxen subcommand
#[derive(Args, Debug)]
pub struct BoxenArgs {
    /// Stack name (default: project directory name)
    pub stack_name: Option<String>,
}

/// `(name, kind)` for every box left after the profile is applied.
pub fn declared_boxen(session: &Session, raw: &RawOptions) -> Result<Vec<(String, String)>> {
    let options = session.options(raw, CredentialPolicy::Optional)?;
    let doc = overlay(&session.ctx, &options, &session.settings)?;

    let Some(Value::Object(boxen)) = doc.get(BOXEN) else {
        return Ok(Vec::new());
    };
    Ok(boxen
        .iter()
        .filter(|(_, declaration)| !declaration.is_null())
        .map(|(name, declaration)| {
            let kind = declaration
                .get("Type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            (name.clone(), kind)
        })
        .collect())
}

pub fn run(session: &Session, mut raw: RawOptions, args: &BoxenArgs) -> Result<()> {
    if let Some(stack_name) = &args.stack_name {
        raw.insert("<stack-name>", stack_name.clone());
    }
    let mut stdout = std::io::stdout().lock();
    for (name, kind) in declared_boxen(session, &raw)? {
        writeln!(stdout, "{name}\t{kind}").map_err(|e| BoxenError::io("<stdout>", e))?;
    }
    Ok(())
}

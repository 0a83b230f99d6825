//! Template materialization.
//!
//! Phases, in order, over the raw root document:
//! 1. **Upgrade** - legacy shorthand to the multi-box schema (root and every profile)
//! 2. **Profile** - merge the selected profile overlay, then give any box
//!    it introduced the default kind
//! 3. **Defaults** - provenance, image parameters, synthesized resources
//! 4. **References** - `Ref`, `Fn::FindInMap` and template functions
//!
//! Every phase fails fast except reference resolution, which leaves
//! anything it cannot resolve for the orchestration service.

pub mod defaults;
pub mod functions;
pub mod profile;
pub mod references;
pub mod upgrade;

pub use defaults::{
    DefaultInputs, declares_deploy_key, fill_defaults, image_parameter, instance_resource,
};
pub use functions::{BootScript, FunctionRegistry, TemplateFunction};
pub use profile::{DEFAULT_PROFILE, apply_profile};
pub use references::{ReferenceContext, resolve_references, transform};
pub use upgrade::{upgrade, upgrade_overlay};

use crate::config::{RootSource, Settings, load_root};
use crate::context::ProjectContext;
use crate::document::{BOXEN, Document, PROFILES, RESOURCES};
use crate::error::Result;
use crate::options::Options;
use crate::providers::Providers;
use serde_json::Value;
use tracing::{debug, info};

/// Where the root config for `options` is read from.
pub fn root_source(ctx: &ProjectContext, options: &Options) -> RootSource {
    if options.config_paths.is_empty() {
        RootSource::Search(ctx.root_dir.clone())
    } else {
        RootSource::Explicit(options.config_paths.clone())
    }
}

/// The merged root document before any phase has run.
pub fn raw_document(ctx: &ProjectContext, options: &Options, settings: &Settings) -> Result<Document> {
    load_root(&root_source(ctx, options), &settings.root_names)
}

/// The root document upgraded, with the selected profile applied.
///
/// Nothing here needs a collaborator.
pub fn overlay(ctx: &ProjectContext, options: &Options, settings: &Settings) -> Result<Document> {
    let mut doc = raw_document(ctx, options, settings)?;

    debug!("Upgrading legacy declarations");
    upgrade(&mut doc)?;
    if let Some(Value::Object(profiles)) = doc.get_mut(PROFILES) {
        profiles.values_mut().try_for_each(upgrade_overlay)?;
    }

    debug!(profile = %options.profile, "Applying profile");
    let mut doc = apply_profile(doc, &options.profile)?;
    upgrade(&mut doc)?;
    Ok(doc)
}

/// Resolve the project into a complete template.
pub fn resolve(
    ctx: &ProjectContext,
    options: &Options,
    settings: &Settings,
    providers: &Providers,
) -> Result<Document> {
    resolve_with(ctx, options, settings, providers, &FunctionRegistry::with_builtins())
}

/// [`resolve`] with a caller-supplied function registry.
pub fn resolve_with(
    ctx: &ProjectContext,
    options: &Options,
    settings: &Settings,
    providers: &Providers,
    registry: &FunctionRegistry,
) -> Result<Document> {
    let mut doc = overlay(ctx, options, settings)?;

    let commit_id = providers.commit.current_commit_id()?;
    let deploy_key = if declares_deploy_key(&doc) {
        None
    } else {
        Some(providers.key.deploy_key_fingerprint()?)
    };
    let inputs = DefaultInputs {
        profile: options.profile.clone(),
        commit_id,
        deploy_key,
        project_name: ctx.project_name(),
    };
    debug!(commit = %inputs.commit_id, "Filling defaults");
    fill_defaults(&mut doc, &inputs);

    debug!("Resolving references");
    let references = ReferenceContext {
        overrides: options.parameters.clone(),
        region: options.region.clone(),
        stack_name: options.stack_name.clone(),
    };
    let doc = resolve_references(doc, &references, registry)?;

    info!(
        stack = %options.stack_name,
        boxen = section_len(&doc, BOXEN),
        resources = section_len(&doc, RESOURCES),
        "Resolved template"
    );
    Ok(doc)
}

fn section_len(doc: &Document, key: &str) -> usize {
    doc.get(key).and_then(Value::as_object).map_or(0, |m| m.len())
}

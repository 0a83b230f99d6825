//! Template subcommand: print the resolved template.

use super::{Session, write_json};
use crate::deploy::{PrebuiltImages, inject_image_ids, stack_body};
use crate::error::Result;
use crate::options::{CredentialPolicy, RawOptions};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the template subcommand
#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// Stack name (default: project directory name)
    pub stack_name: Option<String>,

    /// Image id for a box, as BOX=IMAGE; repeatable
    #[arg(long, value_name = "BOX=IMAGE")]
    pub image: Vec<String>,

    /// Print only what would be submitted to the orchestration service
    #[arg(long)]
    pub stack_body: bool,

    /// Output file path (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run(session: &Session, mut raw: RawOptions, args: &TemplateArgs) -> Result<()> {
    if let Some(stack_name) = &args.stack_name {
        raw.insert("<stack-name>", stack_name.clone());
    }
    let options = session.options(&raw, CredentialPolicy::Optional)?;
    let mut doc = crate::template::resolve(
        &session.ctx,
        &options,
        &session.settings,
        &session.providers,
    )?;

    let images = PrebuiltImages::from_pairs(&args.image)?;
    inject_image_ids(&mut doc, images.images());
    if args.stack_body {
        doc = stack_body(&doc);
    }
    write_json(&doc, args.output.as_deref())
}

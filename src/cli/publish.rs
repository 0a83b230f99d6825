//! Publish subcommand: build the boxen and deploy the stack.

use super::Session;
use crate::deploy::{FileDeployer, PrebuiltImages, publish};
use crate::error::Result;
use crate::options::{CredentialPolicy, RawOptions};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the publish subcommand
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Stack name (default: project directory name)
    pub stack_name: Option<String>,

    /// Box to build; repeatable (default: all declared boxen)
    #[arg(short, long = "box", value_name = "NAME")]
    pub boxen: Vec<String>,

    /// Image id for a box, as BOX=IMAGE; repeatable
    #[arg(long, value_name = "BOX=IMAGE")]
    pub image: Vec<String>,

    /// Where the stack body is written (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run(session: &Session, mut raw: RawOptions, args: &PublishArgs) -> Result<()> {
    if let Some(stack_name) = &args.stack_name {
        raw.insert("<stack-name>", stack_name.clone());
    }
    raw.insert("--boxen", args.boxen.clone());

    let options = session.options(&raw, CredentialPolicy::Required)?;
    let doc = crate::template::resolve(
        &session.ctx,
        &options,
        &session.settings,
        &session.providers,
    )?;

    let builder = PrebuiltImages::from_pairs(&args.image)?;
    let deployer = FileDeployer::new(args.output.clone());
    publish(&doc, &options, &builder, &deployer)?;
    info!(stack = %options.stack_name, "Published stack");
    Ok(())
}

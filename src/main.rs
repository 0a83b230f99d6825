//! boxen command line

use anyhow::{Context, Result};
use boxen_deploy::cli::{self, Cli, Session};
use boxen_deploy::context::ProjectContext;
use boxen_deploy::logging::{LogTarget, init_logging};
use clap::Parser;
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let rust_log = std::env::var("RUST_LOG").ok();
    init_logging(&LogTarget::parse(&cli.log), cli.verbose, rust_log.as_deref())?;

    let root_dir = match &cli.project_dir {
        Some(dir) => std::fs::canonicalize(dir)
            .with_context(|| format!("Project directory {} not found", dir.display()))?,
        None => std::env::current_dir().context("Failed to determine the current directory")?,
    };
    let ctx = ProjectContext::from_process(root_dir);
    debug!(root = %ctx.root_dir.display(), "Starting boxen");

    let session = Session::new(ctx)?;
    cli::run(&cli, &session)?;
    Ok(())
}

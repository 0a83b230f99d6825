//! CLI command definitions for boxen
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod boxen;
pub mod publish;
pub mod template;

use crate::config::Settings;
use crate::context::ProjectContext;
use crate::document::Document;
use crate::error::{BoxenError, Result};
use crate::options::{CredentialPolicy, Options, RawOptions, resolve_options};
use crate::providers::Providers;
use boxen::BoxenArgs;
use clap::{Parser, Subcommand};
use publish::PublishArgs;
use std::io::Write;
use std::path::{Path, PathBuf};
use template::TemplateArgs;

/// Resolve and deploy boxen configuration
#[derive(Parser, Debug)]
#[command(name = "boxen", author, version, about, long_about = None)]
pub struct Cli {
    /// Project directory (default: current directory)
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Root config file or directory; repeat to layer several in order
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Vec<String>,

    /// Profile to overlay on the root config
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Cloud region
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Parameter file(s), comma-separated; repeatable, later files win
    #[arg(long, global = true, value_name = "FILES")]
    pub params_file: Vec<String>,

    /// Parameter definitions KEY=VALUE[,KEY=VALUE...]; override parameter files
    #[arg(short = 'D', long, global = true, value_name = "KEY=VALUE")]
    pub define: Vec<String>,

    /// Access key id (default: AWS_ACCESS_KEY_ID)
    #[arg(long, global = true)]
    pub access_key_id: Option<String>,

    /// Secret access key (default: AWS_SECRET_ACCESS_KEY)
    #[arg(long, global = true)]
    pub secret_access_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved template as JSON
    Template(TemplateArgs),

    /// List the declared boxen and their kinds
    Boxen(BoxenArgs),

    /// Print the merged root config before any resolution
    Config,

    /// Build the selected boxen and deploy the stack
    Publish(PublishArgs),
}

impl Cli {
    /// Global options in flag spelling. Subcommands add their own.
    pub fn raw_options(&self) -> RawOptions {
        let mut raw = RawOptions::new()
            .with("--config", self.config.clone())
            .with("--params-file", self.params_file.clone())
            .with("--define", self.define.clone());
        for (key, value) in [
            ("--profile", &self.profile),
            ("--region", &self.region),
            ("--access-key-id", &self.access_key_id),
            ("--secret-access-key", &self.secret_access_key),
        ] {
            if let Some(value) = value {
                raw.insert(key, value.clone());
            }
        }
        raw
    }
}

/// Everything a subcommand runs with.
pub struct Session {
    pub ctx: ProjectContext,
    pub settings: Settings,
    pub providers: Providers,
}

impl Session {
    pub fn new(ctx: ProjectContext) -> Result<Self> {
        let settings = Settings::load(&ctx)?;
        let providers = Providers::system(&ctx, &settings);
        Ok(Self {
            ctx,
            settings,
            providers,
        })
    }

    pub fn options(&self, raw: &RawOptions, policy: CredentialPolicy) -> Result<Options> {
        resolve_options(
            raw,
            &self.ctx,
            &self.settings,
            self.providers.decryptor.as_ref(),
            policy,
        )
    }
}

/// Run the parsed command.
pub fn run(cli: &Cli, session: &Session) -> Result<()> {
    let raw = cli.raw_options();
    match &cli.command {
        Command::Template(args) => template::run(session, raw, args),
        Command::Boxen(args) => boxen::run(session, raw, args),
        Command::Config => {
            let options = session.options(&raw, CredentialPolicy::Optional)?;
            let doc = crate::template::raw_document(&session.ctx, &options, &session.settings)?;
            write_json(&doc, None)
        }
        Command::Publish(args) => publish::run(session, raw, args),
    }
}

/// Print `doc` as pretty JSON to `output`, or stdout.
pub fn write_json(doc: &Document, output: Option<&Path>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(doc)
        .map_err(|e| BoxenError::collaborator("render", e.to_string()))?;
    match output {
        Some(path) => {
            std::fs::write(path, format!("{rendered}\n")).map_err(|e| BoxenError::io(path, e))
        }
        None => writeln!(std::io::stdout().lock(), "{rendered}")
            .map_err(|e| BoxenError::io("<stdout>", e)),
    }
}

//! Logging setup for the `boxen` binary.
//!
//! The library only emits `tracing` events; this module installs the
//! subscriber. Output goes to one of:
//! - nowhere (`0` / `off`)
//! - stdout (`1` / `stdout`)
//! - stderr (`2` / `stderr`, the default)
//! - a file, appended to without ANSI colors (any other value)
//!
//! `RUST_LOG` takes precedence over `--verbose` when it is set.

use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Off,
    Stdout,
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    /// Parse a `--log` value.
    pub fn parse(value: &str) -> Self {
        match value {
            "0" | "off" => LogTarget::Off,
            "1" | "stdout" => LogTarget::Stdout,
            "2" | "stderr" | "" => LogTarget::Stderr,
            filename => LogTarget::File(PathBuf::from(filename)),
        }
    }
}

/// Default filter directive for the given verbosity.
pub fn default_directive(verbose: bool) -> String {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    level.to_string().to_lowercase()
}

/// Install the global subscriber. `rust_log` is the value of `RUST_LOG`.
pub fn init_logging(target: &LogTarget, verbose: bool, rust_log: Option<&str>) -> anyhow::Result<()> {
    let writer = match target {
        LogTarget::Off => return Ok(()),
        LogTarget::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(file)
        }
    };

    let filter = match rust_log.filter(|v| !v.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::new(default_directive(verbose)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(matches!(target, LogTarget::Stdout | LogTarget::Stderr))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

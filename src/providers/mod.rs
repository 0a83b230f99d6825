//! Collaborators outside the resolution core.
//!
//! Inbound collaborators feed values into resolution (commit id, deploy key
//! fingerprint, decrypted parameter files). Outbound collaborators consume
//! the resolved template (image builds, stack submission). The shipped
//! inbound implementations shell out to `git`, `ssh-keygen` and `gpg`.

mod git;
mod gpg;
mod ssh;

pub use git::GitCommitId;
pub use gpg::GpgDecryptor;
pub use ssh::SshKeyFingerprint;

use crate::config::Settings;
use crate::context::ProjectContext;
use crate::error::{BoxenError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Short commit id of the project being deployed.
pub trait CommitIdProvider {
    fn current_commit_id(&self) -> Result<String>;
}

/// Fingerprint of the key boxen are deployed with.
pub trait KeyLookup {
    fn deploy_key_fingerprint(&self) -> Result<String>;
}

/// Decryption of armored parameter files.
pub trait Decryptor {
    fn decrypt(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Builds one machine image per box declaration.
pub trait ImageBuilder {
    /// Build `declaration` and return the resulting image id.
    fn build(&self, name: &str, declaration: &Value) -> Result<String>;
}

/// Submits a stack body to the orchestration service.
pub trait Deployer {
    fn deploy(&self, stack_name: &str, body: &Value) -> Result<()>;
}

/// The inbound collaborators used by a resolution.
pub struct Providers {
    pub commit: Box<dyn CommitIdProvider>,
    pub key: Box<dyn KeyLookup>,
    pub decryptor: Box<dyn Decryptor>,
}

impl Providers {
    /// Collaborators backed by the programs named in `settings`.
    pub fn system(ctx: &ProjectContext, settings: &Settings) -> Self {
        let public_key = settings
            .ssh_public_key
            .as_ref()
            .map(|path| ctx.resolve_path(path))
            .unwrap_or_else(|| default_public_key(ctx));

        Self {
            commit: Box::new(GitCommitId::new(&settings.git_program, &ctx.root_dir)),
            key: Box::new(SshKeyFingerprint::new(public_key)),
            decryptor: Box::new(GpgDecryptor::new(&settings.gpg_program)),
        }
    }
}

/// `~/.ssh/id_rsa.pub`, preferring `HOME` from the context.
fn default_public_key(ctx: &ProjectContext) -> PathBuf {
    ctx.home_dir()
        .unwrap_or_default()
        .join(".ssh")
        .join("id_rsa.pub")
}

/// A fixed commit id.
#[derive(Debug, Clone)]
pub struct StaticCommitId(pub String);

impl CommitIdProvider for StaticCommitId {
    fn current_commit_id(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// A fixed key fingerprint.
#[derive(Debug, Clone)]
pub struct StaticKey(pub String);

impl KeyLookup for StaticKey {
    fn deploy_key_fingerprint(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Refuses every decryption. For runs that must not prompt.
#[derive(Debug, Clone, Default)]
pub struct NoDecryption;

impl Decryptor for NoDecryption {
    fn decrypt(&self, path: &Path) -> Result<Vec<u8>> {
        Err(BoxenError::DecryptionFailed {
            path: path.to_path_buf(),
            details: "decryption is disabled".to_string(),
        })
    }
}

/// Run `program args...` and return its trimmed stdout.
///
/// A program that cannot be started or exits non-zero is reported as a
/// collaborator failure carrying its stderr.
pub(crate) fn run_program(program: &str, args: &[&str], cwd: Option<&Path>) -> Result<String> {
    let display = format!("{} {}", program, args.join(" "));
    let mut command = Command::new(program);
    command.args(args);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    let output = command
        .output()
        .map_err(|e| BoxenError::collaborator(&display, e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(BoxenError::collaborator(
            display,
            if stderr.is_empty() { format!("exited with {}", output.status) } else { stderr },
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

use super::{KeyLookup, run_program};
use crate::error::{BoxenError, Result};
use std::path::PathBuf;
use tracing::debug;

/// MD5 fingerprint of a public key, as printed by `ssh-keygen -l`.
#[derive(Debug, Clone)]
pub struct SshKeyFingerprint {
    program: String,
    public_key: PathBuf,
}

impl SshKeyFingerprint {
    pub fn new(public_key: PathBuf) -> Self {
        Self {
            program: "ssh-keygen".to_string(),
            public_key,
        }
    }
}

impl KeyLookup for SshKeyFingerprint {
    fn deploy_key_fingerprint(&self) -> Result<String> {
        let key = self.public_key.display().to_string();
        let output = run_program(&self.program, &["-l", "-E", "md5", "-f", &key], None)?;
        let fingerprint = parse_fingerprint(&output).ok_or_else(|| {
            BoxenError::collaborator(&self.program, format!("unexpected output '{output}'"))
        })?;
        debug!(key = %key, "Found deploy key fingerprint");
        Ok(fingerprint)
    }
}

/// Second field of `2048 MD5:aa:bb:... comment (RSA)`, without the hash
/// prefix.
pub(crate) fn parse_fingerprint(output: &str) -> Option<String> {
    let field = output.split_whitespace().nth(1)?;
    let hex = field.strip_prefix("MD5:").unwrap_or(field);
    if hex.is_empty() {
        None
    } else {
        Some(hex.to_string())
    }
}

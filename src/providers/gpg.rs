use super::Decryptor;
use crate::error::{BoxenError, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Decrypts by running `gpg --quiet --decrypt`.
///
/// stdin and stderr stay attached to the terminal so passphrase prompts
/// reach the user; only stdout is captured.
#[derive(Debug, Clone)]
pub struct GpgDecryptor {
    program: String,
}

impl GpgDecryptor {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl Decryptor for GpgDecryptor {
    fn decrypt(&self, path: &Path) -> Result<Vec<u8>> {
        info!(path = %path.display(), "Decrypting parameter file");
        let output = Command::new(&self.program)
            .args(["--quiet", "--decrypt"])
            .arg(path)
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit())
            .stdout(Stdio::piped())
            .output()
            .map_err(|e| BoxenError::DecryptionFailed {
                path: path.to_path_buf(),
                details: format!("could not run {}: {e}", self.program),
            })?;

        if !output.status.success() {
            return Err(BoxenError::DecryptionFailed {
                path: path.to_path_buf(),
                details: format!("{} exited with {}", self.program, output.status),
            });
        }

        debug!(bytes = output.stdout.len(), "Decrypted parameter file");
        Ok(output.stdout)
    }
}

use super::{CommitIdProvider, run_program};
use crate::error::{BoxenError, Result};
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static SHORT_COMMIT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new("^[0-9a-f]{7}$").ok());

/// Commit id of `HEAD` in the project repository.
#[derive(Debug, Clone)]
pub struct GitCommitId {
    program: String,
    root: PathBuf,
}

impl GitCommitId {
    pub fn new(program: &str, root: &Path) -> Self {
        Self {
            program: program.to_string(),
            root: root.to_path_buf(),
        }
    }
}

impl CommitIdProvider for GitCommitId {
    fn current_commit_id(&self) -> Result<String> {
        let output = run_program(
            &self.program,
            &["rev-parse", "--short=7", "HEAD"],
            Some(&self.root),
        )?;
        let commit = validate_commit_id(&output)?;
        debug!(commit = %commit, "Found current commit");
        Ok(commit)
    }
}

/// Accept exactly a seven character lowercase hex id.
pub(crate) fn validate_commit_id(output: &str) -> Result<String> {
    let candidate = output.trim();
    match SHORT_COMMIT.as_ref() {
        Some(pattern) if pattern.is_match(candidate) => Ok(candidate.to_string()),
        _ => Err(BoxenError::InvalidCommitId(candidate.to_string())),
    }
}

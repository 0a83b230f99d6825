//! Explicit project context threaded through every resolution phase.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The project being resolved and the environment it is resolved in.
///
/// Library code reads the working directory and environment variables only
/// through this value.
#[derive(Debug, Clone, Default)]
pub struct ProjectContext {
    /// Project directory; relative config paths are resolved against it.
    pub root_dir: PathBuf,
    /// Environment variables visible to the resolution.
    pub environ: HashMap<String, String>,
}

impl ProjectContext {
    pub fn new(root_dir: impl Into<PathBuf>, environ: HashMap<String, String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            environ,
        }
    }

    /// Capture the current process environment.
    pub fn from_process(root_dir: impl Into<PathBuf>) -> Self {
        Self::new(root_dir, std::env::vars().collect())
    }

    /// Non-empty environment variable.
    pub fn env(&self, name: &str) -> Option<&str> {
        self.environ
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Home directory: `HOME` from the captured environment.
    ///
    /// `dirs::home_dir` is consulted only when `HOME` is unset, which is
    /// the one place the ambient process is read.
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.env("HOME").map(PathBuf::from).or_else(dirs::home_dir)
    }

    /// Resolve `path` against the project directory.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root_dir.join(path)
        }
    }

    /// Name of the project directory, used for descriptions and stack names.
    pub fn project_name(&self) -> String {
        self.root_dir
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("boxen")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_ignores_empty_values() {
        let mut environ = HashMap::new();
        environ.insert("EMPTY".to_string(), String::new());
        environ.insert("SET".to_string(), "1".to_string());
        let ctx = ProjectContext::new("/srv/app", environ);

        assert_eq!(ctx.env("EMPTY"), None);
        assert_eq!(ctx.env("SET"), Some("1"));
        assert_eq!(ctx.env("MISSING"), None);
    }

    #[test]
    fn test_home_dir_prefers_captured_home() {
        let mut environ = HashMap::new();
        environ.insert("HOME".to_string(), "/home/deploy".to_string());
        let ctx = ProjectContext::new("/srv/app", environ);
        assert_eq!(ctx.home_dir(), Some(PathBuf::from("/home/deploy")));
    }

    #[test]
    fn test_resolve_path() {
        let ctx = ProjectContext::new("/srv/app", HashMap::new());
        assert_eq!(ctx.resolve_path("boxen.yaml"), PathBuf::from("/srv/app/boxen.yaml"));
        assert_eq!(ctx.resolve_path("/etc/boxen.yaml"), PathBuf::from("/etc/boxen.yaml"));
    }

    #[test]
    fn test_project_name() {
        assert_eq!(ProjectContext::new("/srv/shop-api", HashMap::new()).project_name(), "shop-api");
        assert_eq!(ProjectContext::new("/", HashMap::new()).project_name(), "boxen");
    }
}

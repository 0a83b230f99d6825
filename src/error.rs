//! Structured error types for configuration resolution.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Error kinds for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    // Loading errors
    IoError,
    ParseError,
    UnrecognizedFormat,
    NoConfigFound,

    // Resolution errors
    UnknownProfile,
    UnknownBox,
    InvalidFunctionArgument,

    // Options errors
    MissingCredential,
    InvalidParameterDefinition,
    DecryptionFailed,
    SettingsError,

    // Collaborator errors
    InvalidCommitId,
    CollaboratorFailed,
}

/// Library-wide error type.
#[derive(Debug, Error)]
pub enum BoxenError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unrecognized config format for {0} (expected .yaml, .yml or .json)")]
    UnrecognizedFormat(PathBuf),

    #[error("No config found in {dir} (looked for {})", .names.join(", "))]
    NoConfigFound { dir: PathBuf, names: Vec<String> },

    #[error("Unknown profile '{name}' (available: {})", display_list(.available))]
    UnknownProfile {
        name: String,
        available: Vec<String>,
    },

    #[error("Unknown box '{name}' (declared: {})", display_list(.declared))]
    UnknownBox { name: String, declared: Vec<String> },

    #[error("Invalid argument to {function}: {reason}")]
    InvalidFunctionArgument { function: String, reason: String },

    #[error("Missing credential: pass --{option} or set {env}")]
    MissingCredential {
        option: &'static str,
        env: &'static str,
    },

    #[error("Invalid parameter definition '{0}': expected key=value")]
    InvalidParameterDefinition(String),

    #[error("Failed to decrypt {path}: {details}")]
    DecryptionFailed { path: PathBuf, details: String },

    #[error("Invalid settings in {path}: {message}")]
    Settings { path: PathBuf, message: String },

    #[error("Invalid commit id '{0}': expected a 7 character short hash")]
    InvalidCommitId(String),

    #[error("{command} failed: {details}")]
    Collaborator { command: String, details: String },
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

impl BoxenError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn invalid_argument(function: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFunctionArgument {
            function: function.to_string(),
            reason: reason.into(),
        }
    }

    pub fn collaborator(command: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Collaborator {
            command: command.into(),
            details: details.into(),
        }
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BoxenError::Io { .. } => ErrorKind::IoError,
            BoxenError::Parse { .. } => ErrorKind::ParseError,
            BoxenError::UnrecognizedFormat(_) => ErrorKind::UnrecognizedFormat,
            BoxenError::NoConfigFound { .. } => ErrorKind::NoConfigFound,
            BoxenError::UnknownProfile { .. } => ErrorKind::UnknownProfile,
            BoxenError::UnknownBox { .. } => ErrorKind::UnknownBox,
            BoxenError::InvalidFunctionArgument { .. } => ErrorKind::InvalidFunctionArgument,
            BoxenError::MissingCredential { .. } => ErrorKind::MissingCredential,
            BoxenError::InvalidParameterDefinition(_) => ErrorKind::InvalidParameterDefinition,
            BoxenError::DecryptionFailed { .. } => ErrorKind::DecryptionFailed,
            BoxenError::Settings { .. } => ErrorKind::SettingsError,
            BoxenError::InvalidCommitId(_) => ErrorKind::InvalidCommitId,
            BoxenError::Collaborator { .. } => ErrorKind::CollaboratorFailed,
        }
    }
}

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, BoxenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::NoConfigFound).unwrap();
        assert_eq!(json, "\"NO_CONFIG_FOUND\"");
    }

    #[test]
    fn test_unknown_profile_lists_available() {
        let err = BoxenError::UnknownProfile {
            name: "Staging".to_string(),
            available: vec!["Production".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unknown profile 'Staging' (available: Production)"
        );
        assert_eq!(err.kind(), ErrorKind::UnknownProfile);
    }

    #[test]
    fn test_empty_list_displays_none() {
        let err = BoxenError::UnknownBox {
            name: "Web".to_string(),
            declared: vec![],
        };
        assert_eq!(err.to_string(), "Unknown box 'Web' (declared: none)");
    }
}

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Parse(String),

    #[error("invalid value at `{path}`: {reason}")]
    Validation { path: String, reason: String },

    #[error("cannot apply override `{path}`: {reason}")]
    Override { path: String, reason: String },
}

impl ConfigError {
    pub(crate) fn validation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn override_error(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Override {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Name of the error kind as reported on the command line.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFoundError",
            Self::Io(_) => "IoError",
            Self::Parse(_) => "ParseError",
            Self::Validation { .. } => "ValidationError",
            Self::Override { .. } => "OverrideError",
        }
    }

    /// One-line message the binaries print to stderr before exiting with 1.
    pub fn report(&self) -> String {
        format!("error[{}]: {}", self.kind(), self)
    }

    /// Dotted key path the error refers to, if any.
    pub fn key_path(&self) -> Option<&str> {
        match self {
            Self::Validation { path, .. } | Self::Override { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

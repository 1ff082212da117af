use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failure reported by a host collaborator while running the final command.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("host unavailable: {0}")]
    Unavailable(String),
    #[error("command rejected: {0}")]
    Rejected(String),
}

/// Answer that a prompt kind refuses to normalise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct AnswerRejected {
    pub reason: String,
}

impl AnswerRejected {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

//! Error types for roster-core.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can be wrong with an audit configuration.
///
/// All of these are detected before any git command runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for the expected shape.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A required key was absent or empty.
    #[error("missing required config key '{0}'")]
    MissingKey(&'static str),

    /// `repo` is not of the form `organization/reponame`.
    #[error("'repo' must be of the form 'organization/reponame', got '{0}'")]
    InvalidRepo(String),

    /// `sshkey` is not valid base64.
    #[error("'sshkey' could not be base64 decoded: {0}")]
    InvalidSshKey(#[from] base64::DecodeError),
}

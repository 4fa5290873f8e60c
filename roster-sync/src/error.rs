//! Error types for roster-sync.

use std::path::PathBuf;

use thiserror::Error;

use roster_core::{ActionKind, ConfigError, EntityKey};
use roster_git::GitError;

use crate::codec::CodecError;

/// All errors that can arise from an audit run.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The configuration was rejected before any git command ran.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A git command failed.
    #[error("git error: {0}")]
    Git(#[from] GitError),

    /// An I/O error in the checkout, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An entity key cannot be mapped to a mirror path.
    #[error("path codec error: {0}")]
    Codec(#[from] CodecError),

    /// An update or delete action arrived without the entity's prior state.
    #[error("{kind} action for {key} carries no prior state")]
    MissingExisting { key: EntityKey, kind: ActionKind },

    /// `commit` was called before `setup`.
    #[error("must run setup before commit")]
    NotPrepared,
}

/// Convenience constructor for [`AuditError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> AuditError {
    AuditError::Io {
        path: path.into(),
        source,
    }
}

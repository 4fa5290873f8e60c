//! Error types for roster-git.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from running git against a working copy.
#[derive(Debug, Error)]
pub enum GitError {
    /// The command exited non-zero. Captured output is kept for diagnostics.
    #[error("command failed ({status}): {command}")]
    CommandFailed {
        command: String,
        status: i32,
        stdout: String,
        stderr: String,
    },

    /// The binary could not be started at all.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("attempted to run git in non-existing directory {path}")]
    MissingDirectory { path: PathBuf },

    #[error("{path} does not exist or is not a git repository")]
    NotARepository { path: PathBuf },

    #[error("cannot clone to {path}: already exists")]
    AlreadyExists { path: PathBuf },
}

/// Convenience constructor for [`GitError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> GitError {
    GitError::Io {
        path: path.into(),
        source,
    }
}

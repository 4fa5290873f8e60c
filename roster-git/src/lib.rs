//! # roster-git
//!
//! Synchronous `git` subprocess execution for the audit mirror.
//!
//! [`CommandRunner`] runs the binary with an argument vector, optionally
//! behind a throwaway [`SshIdentity`]. [`WorkingCopy`] builds the clone / pull
//! / add / commit / push primitives on top of it and implements [`Vcs`], the
//! seam the transaction applier is written against.

pub mod error;
pub mod runner;
pub mod ssh;
pub mod working_copy;

pub use error::GitError;
pub use runner::{CommandOutput, CommandRunner, RunOptions};
pub use ssh::SshIdentity;
pub use working_copy::{CommitOutcome, Vcs, WorkingCopy};

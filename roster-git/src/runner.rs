//! Git subprocess runner.
//!
//! Commands are executed with an argument vector; nothing goes through a
//! shell. Every call blocks until the child exits and there is no timeout at
//! this layer.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::GitError;
use crate::ssh::{SshIdentity, DEFAULT_SSH_BINARY};

/// Captured result of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, or `-1` if the child was killed by a signal.
    pub status: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Per-call execution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Wrap the call with a throwaway SSH identity.
    pub ssh: bool,
    /// Turn a non-zero exit into [`GitError::CommandFailed`].
    pub raise_on_error: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ssh: false,
            raise_on_error: true,
        }
    }
}

impl RunOptions {
    pub fn ssh() -> Self {
        Self {
            ssh: true,
            ..Self::default()
        }
    }

    /// Return the raw output on failure instead of an error.
    pub fn allow_failure(mut self) -> Self {
        self.raise_on_error = false;
        self
    }
}

/// Runs the git binary with the configured SSH key material.
#[derive(Clone)]
pub struct CommandRunner {
    program: PathBuf,
    ssh_binary: PathBuf,
    sshkey: Vec<u8>,
}

impl std::fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRunner")
            .field("program", &self.program)
            .field("ssh_binary", &self.ssh_binary)
            .finish_non_exhaustive()
    }
}

impl CommandRunner {
    pub fn new(sshkey: Vec<u8>) -> Self {
        Self {
            program: PathBuf::from("git"),
            ssh_binary: PathBuf::from(DEFAULT_SSH_BINARY),
            sshkey,
        }
    }

    /// Use a different binary in place of `git`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Use a different ssh client inside the wrapper script.
    pub fn with_ssh_binary(mut self, ssh_binary: impl Into<PathBuf>) -> Self {
        self.ssh_binary = ssh_binary.into();
        self
    }

    /// Run the program with `args` in `dir`.
    pub fn run(&self, dir: &Path, args: &[&str], opts: RunOptions) -> Result<CommandOutput, GitError> {
        if !dir.is_dir() {
            return Err(GitError::MissingDirectory {
                path: dir.to_path_buf(),
            });
        }

        let commandline = self.display(args);
        tracing::debug!("Execute: {commandline}");

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .current_dir(dir)
            // Output is matched against in a few places ("nothing to commit").
            .env("LC_ALL", "C");

        // Bound to this scope: the identity directory is removed when the
        // guard drops, whichever way this function returns.
        let identity = if opts.ssh {
            Some(SshIdentity::create(&self.sshkey, &self.ssh_binary)?)
        } else {
            None
        };
        if let Some(identity) = &identity {
            cmd.env("GIT_SSH", identity.wrapper_path());
        }

        let output = cmd.output().map_err(|source| GitError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;
        drop(identity);

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code().unwrap_or(-1),
        };

        if !result.success() && opts.raise_on_error {
            for line in result.stdout.lines().filter(|l| !l.trim().is_empty()) {
                tracing::warn!("[stdout] {line}");
            }
            for line in result.stderr.lines().filter(|l| !l.trim().is_empty()) {
                tracing::warn!("[stderr] {line}");
            }
            tracing::error!("Command failed ({}): {commandline}", result.status);
            return Err(GitError::CommandFailed {
                command: commandline,
                status: result.status,
                stdout: result.stdout,
                stderr: result.stderr,
            });
        }

        Ok(result)
    }

    /// Human-readable command line, for logs and error messages only.
    fn display(&self, args: &[&str]) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(args.iter().map(|a| {
            if a.is_empty() || a.contains(char::is_whitespace) {
                format!("{a:?}")
            } else {
                (*a).to_owned()
            }
        }));
        parts.join(" ")
    }
}

//! Throwaway SSH identity for a single git invocation.
//!
//! ```text
//! <tmp>/roster-ssh-XXXXXX/   (mode 0700, removed on drop)
//!   key                      (mode 0400, private key material)
//!   ssh                      (mode 0700, wrapper pointed to by GIT_SSH)
//! ```
//!
//! The wrapper disables host-key verification, ignores any user ssh config
//! and forces the single identity above.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{io_err, GitError};

/// Default ssh client invoked by the wrapper script.
pub const DEFAULT_SSH_BINARY: &str = "/usr/bin/ssh";

/// A scoped key + wrapper pair. Dropping it deletes the whole directory.
#[derive(Debug)]
pub struct SshIdentity {
    dir: TempDir,
    key: PathBuf,
    wrapper: PathBuf,
}

impl SshIdentity {
    /// Write `key_material` and a wrapper script calling `ssh_binary` into a
    /// fresh private temporary directory.
    pub fn create(key_material: &[u8], ssh_binary: &Path) -> Result<Self, GitError> {
        let dir = tempfile::Builder::new()
            .prefix("roster-ssh-")
            .tempdir()
            .map_err(|e| io_err(std::env::temp_dir(), e))?;

        let key = dir.path().join("key");
        fs::write(&key, key_material).map_err(|e| io_err(&key, e))?;
        set_mode(&key, 0o400)?;

        let wrapper = dir.path().join("ssh");
        fs::write(&wrapper, wrapper_script(ssh_binary, &key)).map_err(|e| io_err(&wrapper, e))?;
        set_mode(&wrapper, 0o700)?;

        Ok(Self { dir, key, wrapper })
    }

    /// Path to hand to git through `GIT_SSH`.
    pub fn wrapper_path(&self) -> &Path {
        &self.wrapper
    }

    pub fn key_path(&self) -> &Path {
        &self.key
    }

    pub fn dir_path(&self) -> &Path {
        self.dir.path()
    }
}

fn wrapper_script(ssh_binary: &Path, key: &Path) -> String {
    format!(
        "#!/bin/sh\n\
         exec {ssh} -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null \\\n  \
         -o IdentityFile={key} -o IdentitiesOnly=yes \\\n  \
         -F /dev/null \\\n  \
         \"$@\"\n",
        ssh = sh_quote(&ssh_binary.to_string_lossy()),
        key = sh_quote(&key.to_string_lossy()),
    )
}

/// Single-quote a value for a POSIX shell script.
fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), GitError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), GitError> {
    Ok(())
}

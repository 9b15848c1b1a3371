//! Advisory install lock.
//!
//! Installation may be driven by independent processes sharing one cache
//! directory, so exclusion is a lock file rather than an in-process mutex.
//! The lock is advisory: it guards the install path only, and readers of
//! an already-complete entry never take it.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::error::{CacheError, CacheResult};

/// Held while installing one atlas; the lock file is removed on drop.
#[derive(Debug)]
pub struct InstallLock {
    path: PathBuf,
}

impl InstallLock {
    /// Acquire the lock by creating the lock file.
    ///
    /// Fails when the file already exists: another process is installing
    /// the same atlas, or a previous install crashed and left the file
    /// behind; the error names the path so the user can remove a stale
    /// lock.
    pub fn acquire(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|source| {
                if source.kind() == io::ErrorKind::AlreadyExists {
                    CacheError::Locked {
                        path: path.to_path_buf(),
                    }
                } else {
                    CacheError::Write {
                        path: path.to_path_buf(),
                        source,
                    }
                }
            })?;

        // The owner pid helps a human decide whether the lock is stale.
        let _ = writeln!(file, "{}", std::process::id());

        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("could not remove lock file {}: {}", self.path.display(), e);
        }
    }
}

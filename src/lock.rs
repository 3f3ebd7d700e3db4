//! Single-instance guard
//!
//! Acquires a process-exclusive advisory lock on a well-known file at
//! startup, before any other initialization. A second daemon instance
//! fails to acquire the lock and must exit with the documented
//! "already running" status without loading configuration or starting
//! the scheduler. The lock has no release API; the descriptor is held
//! for the process lifetime and the kernel drops the lock at exit.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::info;

use crate::error::{SnapError, SnapResult};

/// Holds the exclusive instance lock for the process lifetime
#[derive(Debug)]
pub struct InstanceGuard {
    // Kept alive so the advisory lock stays held.
    _file: File,
    path: PathBuf,
}

impl InstanceGuard {
    /// Try to acquire the exclusive lock at `path`
    ///
    /// Returns `SnapError::Lock` when another process already holds it.
    pub fn acquire(path: &Path) -> SnapResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SnapError::Io(format!(
                    "Failed to create lock directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                SnapError::Io(format!("Failed to open lock file {}: {}", path.display(), e))
            })?;

        file.try_lock_exclusive().map_err(|_| {
            SnapError::Lock(format!(
                "another instance is already running (lock held on {})",
                path.display()
            ))
        })?;

        // Best-effort pid note for operators inspecting the lock file.
        let _ = file.set_len(0);
        let _ = writeln!(file, "{}", std::process::id());

        info!("acquired instance lock on {}", path.display());

        Ok(Self {
            _file: file,
            path: path.to_path_buf(),
        })
    }

    /// Path of the held lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

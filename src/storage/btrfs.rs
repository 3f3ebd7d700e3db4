//! Btrfs implementation of the storage capability
//!
//! Shells out to `stat` for filesystem-type probing and to the `btrfs`
//! tool for subvolume snapshot creation and deletion, mirroring how an
//! administrator would run these by hand. Stdout and stderr are merged
//! into one diagnostic string; classification of that text is left to
//! the snapshot store.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{SnapError, SnapResult};
use crate::storage::backend::{CommandOutcome, VolumeBackend};

/// Filesystem type reported by `stat -f` for btrfs volumes
const BTRFS_TYPE: &str = "btrfs";

/// Invokes the btrfs userspace tools
#[derive(Debug, Clone, Copy, Default)]
pub struct BtrfsBackend;

impl BtrfsBackend {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, program: &str, args: &[&str], paths: &[&Path]) -> SnapResult<CommandOutcome> {
        let mut command = Command::new(program);
        command.args(args);
        for path in paths {
            command.arg(path);
        }

        debug!("running {:?}", command);

        let output = command
            .output()
            .map_err(|e| SnapError::Storage(format!("Failed to run {}: {}", program, e)))?;

        let mut diagnostic = String::from_utf8_lossy(&output.stdout).into_owned();
        diagnostic.push_str(&String::from_utf8_lossy(&output.stderr));

        debug!("the output is '{}'", diagnostic.trim());

        Ok(CommandOutcome {
            success: output.status.success(),
            diagnostic,
        })
    }
}

impl VolumeBackend for BtrfsBackend {
    fn verify_type(&self, path: &Path) -> bool {
        match self.run("stat", &["-f", "--format=%T"], &[path]) {
            Ok(outcome) => outcome.success && outcome.diagnostic.trim() == BTRFS_TYPE,
            Err(_) => false,
        }
    }

    fn create_snapshot(&self, source: &Path, dest: &Path) -> SnapResult<CommandOutcome> {
        self.run("btrfs", &["subvolume", "snapshot"], &[source, dest])
    }

    fn delete_snapshot(&self, target: &Path) -> SnapResult<CommandOutcome> {
        self.run("btrfs", &["subvolume", "delete"], &[target])
    }
}

//! Storage capability interface
//!
//! The snapshot lifecycle engine never invokes the filesystem snapshot
//! primitive directly; it goes through this trait so that the engine can
//! be exercised against a scripted backend in tests and so that the
//! external-command plumbing stays in one place.

use std::path::Path;

use crate::error::SnapResult;

/// Result of invoking an external snapshot primitive
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Whether the process ran and exited successfully
    pub success: bool,
    /// Combined textual output of the primitive, kept raw for
    /// classification and diagnostics
    pub diagnostic: String,
}

/// Capability interface over the underlying copy-on-write filesystem
pub trait VolumeBackend: Send + Sync {
    /// True iff the filesystem metadata at `path` reports the expected
    /// storage type. Side-effect free.
    fn verify_type(&self, path: &Path) -> bool;

    /// Create a snapshot of `source` at `dest`
    fn create_snapshot(&self, source: &Path, dest: &Path) -> SnapResult<CommandOutcome>;

    /// Delete the snapshot at `target`
    fn delete_snapshot(&self, target: &Path) -> SnapResult<CommandOutcome>;
}

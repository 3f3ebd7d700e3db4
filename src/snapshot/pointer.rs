//! "Latest snapshot" pointer management
//!
//! Each repository level has a single symlink that downstream consumers
//! dereference instead of tracking snapshot names. The link is updated in
//! two phases after a rotation: immediately to the previous survivor (the
//! just-created snapshot may still be settling), then — half a scheduling
//! period later — to the newest survivor.
//!
//! Replacing the link is remove-then-create, not atomic. The narrow
//! window where the link is absent is accepted: only one writer ever
//! targets a given link path.

use std::fs;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::config::model::RepositoryConfig;
use crate::snapshot::name::SnapshotName;
use crate::state::status::StatusStore;

/// Maintains the per-repository "latest" symlink
pub struct PointerManager {
    /// Whether the process may mutate filesystem references. Without
    /// privilege the link is left stale and the update logged.
    privileged: bool,
}

impl PointerManager {
    pub fn new(privileged: bool) -> Self {
        Self { privileged }
    }

    /// Point the repository's link at the given resolved snapshot path
    ///
    /// An absent target performs no filesystem mutation and records a
    /// runtime error. Missing privilege degrades to a logged no-op.
    pub fn update_link(
        &self,
        config: &RepositoryConfig,
        target: Option<&Path>,
        status: &StatusStore,
    ) {
        let Some(target) = target else {
            status.record_runtime_error(format!(
                "no valid snapshot target for {}",
                config.full_name()
            ));
            return;
        };

        let link_path = &config.link_path;
        info!(
            "creating symbolic link '{}' to path '{}'",
            link_path.display(),
            target.display()
        );

        if !self.privileged {
            error!("running without root privileges, symbolic link will not be created");
            return;
        }

        if link_path.is_symlink() {
            debug!("the path {} exists, removing it", link_path.display());
            if let Err(e) = fs::remove_file(link_path) {
                status.record_runtime_error(format!(
                    "failed to remove old link {}: {}",
                    link_path.display(),
                    e
                ));
                return;
            }
        } else {
            debug!("the path {} does not exist", link_path.display());
        }

        if let Err(e) = std::os::unix::fs::symlink(target, link_path) {
            status.record_runtime_error(format!(
                "failed to create link {}: {}",
                link_path.display(),
                e
            ));
        }
    }

    /// Remove the repository's link if present (delete-all support)
    pub fn remove_link(&self, config: &RepositoryConfig) {
        let link_path = &config.link_path;
        if link_path.is_symlink() {
            info!("deleting link {}", link_path.display());
            if let Err(e) = fs::remove_file(link_path) {
                warn!("failed to delete link {}: {}", link_path.display(), e);
            }
        }
    }

    /// Whether the link currently resolves to an existing snapshot
    pub fn link_resolves(&self, config: &RepositoryConfig) -> bool {
        let link_path = &config.link_path;
        if !link_path.is_symlink() {
            return false;
        }
        match fs::read_link(link_path) {
            Ok(target) => target.exists(),
            Err(_) => false,
        }
    }
}

/// Select the phase-1 target: the previous (second-newest) survivor
///
/// Expects the ascending survivor list of a rotation. Two survivors is
/// the normal case; exactly one is degraded but handled by pointing at
/// the sole survivor; more than two means deletions failed, which is
/// recorded, and the second-newest is still the safe choice. An empty
/// list records an error and selects nothing.
pub fn previous_survivor<'a>(
    survivors: &'a [SnapshotName],
    config: &RepositoryConfig,
    status: &StatusStore,
) -> Option<&'a SnapshotName> {
    match survivors.len() {
        0 => {
            status.record_runtime_error(format!(
                "wrong number of snapshots (0) for {}, 2 expected",
                config.full_name()
            ));
            None
        }
        1 => {
            warn!(
                "only one snapshot survives for {}, expected 2; pointing at it",
                config.full_name()
            );
            Some(&survivors[0])
        }
        2 => Some(&survivors[0]),
        n => {
            status.record_runtime_error(format!(
                "wrong number of snapshots ({}) for {}, 2 expected",
                n,
                config.full_name()
            ));
            Some(&survivors[n - 2])
        }
    }
}

/// Select the phase-2 target: the newest survivor
pub fn newest_survivor<'a>(
    survivors: &'a [SnapshotName],
    config: &RepositoryConfig,
    status: &StatusStore,
) -> Option<&'a SnapshotName> {
    if survivors.is_empty() {
        status.record_runtime_error(format!(
            "no snapshots available for {} when repointing link",
            config.full_name()
        ));
        return None;
    }
    survivors.last()
}

//! Snapshot store
//!
//! Creates, lists and deletes snapshots of a repository through the
//! injected storage capability. Snapshots for a repository live under
//! `<path>/snapshots/<level>/`, one folder per snapshot.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::model::RepositoryConfig;
use crate::error::{SnapError, SnapResult};
use crate::snapshot::name::SnapshotName;
use crate::storage::backend::VolumeBackend;

/// Marker substrings in primitive output that classify an invocation as
/// failed regardless of exit status. The btrfs tool prints `ERROR:` on
/// operational failures and a usage banner on argument mistakes.
const FAILURE_MARKERS: [&str; 2] = ["ERROR", "usage"];

/// Creates, lists and deletes snapshots through a `VolumeBackend`
#[derive(Clone)]
pub struct SnapshotStore {
    backend: Arc<dyn VolumeBackend>,
}

impl SnapshotStore {
    pub fn new(backend: Arc<dyn VolumeBackend>) -> Self {
        Self { backend }
    }

    /// True iff `path` reports the expected storage filesystem type
    pub fn verify_repository(&self, path: &std::path::Path) -> bool {
        self.backend.verify_type(path)
    }

    /// Create a new snapshot of the repository
    ///
    /// Generates a timestamp-derived identifier, ensures the snapshot
    /// root and per-level folder exist, then invokes the snapshot
    /// primitive. Output carrying an error or usage marker is a failure
    /// with the raw diagnostic attached.
    pub fn create(&self, config: &RepositoryConfig) -> SnapResult<SnapshotName> {
        let name = SnapshotName::now();
        let level_dir = self.ensure_level_dir(config)?;
        let dest = level_dir.join(name.as_str());

        info!("creating snapshot {} for {}", name, config.full_name());

        let outcome = self.backend.create_snapshot(&config.path, &dest)?;
        if !outcome.success || output_indicates_failure(&outcome.diagnostic) {
            return Err(SnapError::Runtime(format!(
                "failed to create snapshot for {}: {}",
                config.full_name(),
                outcome.diagnostic.trim()
            )));
        }

        Ok(name)
    }

    /// List the repository's snapshots, ascending by creation time
    ///
    /// A folder entry that does not parse as a snapshot name is an
    /// error, not a silent skip: it means something else has written
    /// into the level folder and ordering can no longer be trusted.
    pub fn list(&self, config: &RepositoryConfig) -> SnapResult<Vec<SnapshotName>> {
        let level_dir = config.level_dir();

        if !level_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&level_dir).map_err(|e| {
            SnapError::Io(format!("Failed to read {}: {}", level_dir.display(), e))
        })?;

        let mut snapshots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                SnapError::Io(format!("Failed to read directory entry: {}", e))
            })?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            snapshots.push(SnapshotName::parse(&name)?);
        }

        snapshots.sort();
        debug!("{} has {} snapshots", config.full_name(), snapshots.len());

        Ok(snapshots)
    }

    /// Delete one snapshot
    ///
    /// Failures are classified and reported but the caller never
    /// escalates them to a fatal condition; a failed deletion is retried
    /// at the next scheduled rotation when the snapshot shows up in the
    /// expired set again.
    pub fn delete(&self, config: &RepositoryConfig, name: &SnapshotName) -> SnapResult<()> {
        let target = self.snapshot_path(config, name);

        info!("deleting snapshot {}", target.display());

        let outcome = self.backend.delete_snapshot(&target)?;
        if !outcome.success || output_indicates_failure(&outcome.diagnostic) {
            error!("failed to delete snapshot {}", target.display());
            return Err(SnapError::Runtime(format!(
                "failed to delete snapshot {}: {}",
                target.display(),
                outcome.diagnostic.trim()
            )));
        }

        Ok(())
    }

    /// Absolute on-disk path of a snapshot
    pub fn snapshot_path(&self, config: &RepositoryConfig, name: &SnapshotName) -> PathBuf {
        config.snapshot_path(name.as_str())
    }

    fn ensure_level_dir(&self, config: &RepositoryConfig) -> SnapResult<PathBuf> {
        let level_dir = config.level_dir();

        if !level_dir.exists() {
            debug!("folder {} does not exist, creating", level_dir.display());
            fs::create_dir_all(&level_dir).map_err(|e| {
                SnapError::Io(format!(
                    "Failed to create {}: {}",
                    level_dir.display(),
                    e
                ))
            })?;
        }

        Ok(level_dir)
    }
}

/// True when primitive output carries an error or usage-diagnostic marker
fn output_indicates_failure(diagnostic: &str) -> bool {
    FAILURE_MARKERS.iter().any(|marker| diagnostic.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    use crate::config::model::TimeUnit;
    use crate::storage::backend::CommandOutcome;

    /// Scripted backend: materializes snapshots as plain directories and
    /// can be told to fail with a given diagnostic.
    struct ScriptedBackend {
        create_diagnostic: Option<String>,
        delete_diagnostic: Option<String>,
    }

    impl ScriptedBackend {
        fn working() -> Self {
            Self {
                create_diagnostic: None,
                delete_diagnostic: None,
            }
        }

        fn failing_create(diagnostic: &str) -> Self {
            Self {
                create_diagnostic: Some(diagnostic.to_string()),
                delete_diagnostic: None,
            }
        }

        fn failing_delete(diagnostic: &str) -> Self {
            Self {
                create_diagnostic: None,
                delete_diagnostic: Some(diagnostic.to_string()),
            }
        }
    }

    impl VolumeBackend for ScriptedBackend {
        fn verify_type(&self, path: &Path) -> bool {
            path.exists()
        }

        fn create_snapshot(&self, _source: &Path, dest: &Path) -> SnapResult<CommandOutcome> {
            if let Some(diagnostic) = &self.create_diagnostic {
                return Ok(CommandOutcome {
                    success: true,
                    diagnostic: diagnostic.clone(),
                });
            }
            fs::create_dir_all(dest).unwrap();
            Ok(CommandOutcome {
                success: true,
                diagnostic: format!("Create a snapshot of '{}'", dest.display()),
            })
        }

        fn delete_snapshot(&self, target: &Path) -> SnapResult<CommandOutcome> {
            if let Some(diagnostic) = &self.delete_diagnostic {
                return Ok(CommandOutcome {
                    success: true,
                    diagnostic: diagnostic.clone(),
                });
            }
            fs::remove_dir_all(target).unwrap();
            Ok(CommandOutcome {
                success: true,
                diagnostic: String::new(),
            })
        }
    }

    fn test_config(temp: &TempDir) -> RepositoryConfig {
        RepositoryConfig {
            repository: "data".into(),
            path: temp.path().to_path_buf(),
            level: "hourly".into(),
            frequency: 1,
            unit: TimeUnit::Hour,
            link_path: temp.path().join("latest"),
        }
    }

    fn store_with(backend: ScriptedBackend) -> SnapshotStore {
        SnapshotStore::new(Arc::new(backend))
    }

    #[test]
    fn test_create_builds_level_dir_and_snapshot() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let store = store_with(ScriptedBackend::working());

        let name = store.create(&config).unwrap();

        let expected = config.level_dir().join(name.as_str());
        assert!(config.level_dir().exists());
        assert!(expected.exists());
    }

    #[test]
    fn test_create_classifies_error_marker() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let store = store_with(ScriptedBackend::failing_create(
            "ERROR: cannot snapshot '/data': read-only filesystem",
        ));

        let err = store.create(&config).unwrap_err();
        assert!(matches!(err, SnapError::Runtime(_)));
        assert!(err.to_string().contains("read-only filesystem"));
    }

    #[test]
    fn test_create_classifies_usage_marker() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let store = store_with(ScriptedBackend::failing_create("usage: btrfs subvolume"));

        assert!(store.create(&config).is_err());
    }

    #[test]
    fn test_list_sorts_ascending() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let store = store_with(ScriptedBackend::working());

        let level_dir = config.level_dir();
        fs::create_dir_all(&level_dir).unwrap();
        // Created out of order on purpose.
        for name in [
            "snapshot-2020-01-03_00-00-00",
            "snapshot-2020-01-01_00-00-00",
            "snapshot-2020-01-02_00-00-00",
        ] {
            fs::create_dir(level_dir.join(name)).unwrap();
        }

        let listed = store.list(&config).unwrap();
        let names: Vec<&str> = listed.iter().map(|n| n.as_str()).collect();
        assert_eq!(
            names,
            [
                "snapshot-2020-01-01_00-00-00",
                "snapshot-2020-01-02_00-00-00",
                "snapshot-2020-01-03_00-00-00",
            ]
        );
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let store = store_with(ScriptedBackend::working());

        assert!(store.list(&config).unwrap().is_empty());
    }

    #[test]
    fn test_list_rejects_malformed_entry() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let store = store_with(ScriptedBackend::working());

        let level_dir = config.level_dir();
        fs::create_dir_all(&level_dir).unwrap();
        fs::create_dir(level_dir.join("snapshot-2020-01-01_00-00-00")).unwrap();
        fs::create_dir(level_dir.join("stray-folder")).unwrap();

        assert!(store.list(&config).is_err());
    }

    #[test]
    fn test_delete_removes_snapshot() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let store = store_with(ScriptedBackend::working());

        let name = store.create(&config).unwrap();
        assert_eq!(store.list(&config).unwrap().len(), 1);

        store.delete(&config, &name).unwrap();
        assert!(store.list(&config).unwrap().is_empty());
    }

    #[test]
    fn test_delete_failure_is_classified_not_fatal() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let store = store_with(ScriptedBackend::failing_delete(
            "ERROR: Could not destroy subvolume",
        ));

        let name = SnapshotName::parse("snapshot-2020-01-01_00-00-00").unwrap();
        let err = store.delete(&config, &name).unwrap_err();
        assert!(matches!(err, SnapError::Runtime(_)));
    }

    #[test]
    fn test_snapshot_path_layout() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let store = store_with(ScriptedBackend::working());
        let name = SnapshotName::parse("snapshot-2020-01-01_00-00-00").unwrap();

        assert_eq!(
            store.snapshot_path(&config, &name),
            PathBuf::from(temp.path())
                .join("snapshots")
                .join("hourly")
                .join("snapshot-2020-01-01_00-00-00")
        );
    }
}

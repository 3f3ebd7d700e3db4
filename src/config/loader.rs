//! Configuration loading and validation
//!
//! Parses the daemon's JSON configuration file and validates each
//! repository/level entry into the immutable active set. An invalid
//! entry is skipped — with the reason recorded in the service state —
//! and loading continues; only a configuration with zero valid entries
//! aborts startup.
//!
//! ## File format
//!
//! ```json
//! {
//!   "repositories": [
//!     {
//!       "name": "etc",
//!       "path": "/data/etc",
//!       "snapshot_levels": [
//!         { "name": "hourly", "frequency": 4, "unit": "hour",
//!           "link": "/data/etc-latest" }
//!       ]
//!     }
//!   ],
//!   "stoppers": ["/etc/btrsnapd/disable"]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::model::{is_empty_path, RepositoryConfig, TimeUnit};
use crate::error::{SnapError, SnapResult};
use crate::snapshot::store::SnapshotStore;
use crate::state::status::StatusStore;
use crate::storage::file_io;

/// The validated in-memory configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Active set of repository/level entries, in file order
    pub repositories: Vec<RepositoryConfig>,
    /// Sentinel paths whose existence suspends scheduling
    pub stoppers: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawConfigFile {
    #[serde(default)]
    repositories: Vec<RawRepository>,
    stoppers: Option<Vec<PathBuf>>,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    name: Option<String>,
    path: Option<PathBuf>,
    #[serde(default)]
    snapshot_levels: Vec<RawLevel>,
}

#[derive(Debug, Deserialize)]
struct RawLevel {
    name: Option<String>,
    frequency: Option<u32>,
    unit: Option<String>,
    link: Option<PathBuf>,
}

/// Load and validate the configuration file
///
/// `store` provides the storage-type verification for repository paths.
/// Per-entry failures are recorded through `status` and skipped; an
/// unreadable file or an empty active set is an error.
pub fn load(
    config_file: &Path,
    store: &SnapshotStore,
    status: &StatusStore,
) -> SnapResult<DaemonConfig> {
    info!("using configuration file {}", config_file.display());

    let raw: RawConfigFile = file_io::read_json_required(config_file)
        .map_err(|e| SnapError::Config(format!("failed to load configuration: {}", e)))?;

    let mut repositories = Vec::new();

    for repository in &raw.repositories {
        let Some(repo_name) = &repository.name else {
            status.record_config_error("name parameter was not found, skipping repository");
            continue;
        };
        let Some(repo_path) = &repository.path else {
            status.record_config_error(format!(
                "repository '{}' has no path, skipping",
                repo_name
            ));
            continue;
        };

        for level in &repository.snapshot_levels {
            match validate_level(repo_name, repo_path, level, store) {
                Ok(config) => {
                    debug!("{} loaded", config.full_name());
                    repositories.push(config);
                }
                Err(SnapError::Config(reason)) => status.record_config_error(reason),
                Err(other) => return Err(other),
            }
        }
    }

    let stoppers = match raw.stoppers {
        Some(stoppers) => stoppers,
        None => {
            status.record_config_error("stopper section does not exist");
            Vec::new()
        }
    };

    if repositories.is_empty() {
        return Err(SnapError::Config(
            "no valid repository entries in configuration".into(),
        ));
    }

    Ok(DaemonConfig {
        repositories,
        stoppers,
    })
}

fn validate_level(
    repo_name: &str,
    repo_path: &Path,
    level: &RawLevel,
    store: &SnapshotStore,
) -> SnapResult<RepositoryConfig> {
    let Some(level_name) = &level.name else {
        return Err(SnapError::Config(format!(
            "repository '{}' has a level without a name, skipping",
            repo_name
        )));
    };
    let Some(frequency) = level.frequency else {
        return Err(SnapError::Config(format!(
            "level '{}:{}' has no frequency, skipping",
            repo_name, level_name
        )));
    };
    if frequency == 0 {
        return Err(SnapError::Config(format!(
            "level '{}:{}' has zero frequency, skipping",
            repo_name, level_name
        )));
    }
    let unit = match &level.unit {
        Some(raw_unit) => match TimeUnit::from_config_str(raw_unit) {
            Some(unit) => unit,
            None => {
                return Err(SnapError::Config(format!(
                    "level '{}:{}' has unknown unit '{}', skipping",
                    repo_name, level_name, raw_unit
                )))
            }
        },
        None => {
            return Err(SnapError::Config(format!(
                "level '{}:{}' has no unit, skipping",
                repo_name, level_name
            )))
        }
    };
    let Some(link) = &level.link else {
        return Err(SnapError::Config(format!(
            "level '{}:{}' has no link, skipping",
            repo_name, level_name
        )));
    };
    if is_empty_path(link) {
        return Err(SnapError::Config(format!(
            "level '{}:{}' has an empty link, skipping",
            repo_name, level_name
        )));
    }

    if !store.verify_repository(repo_path) {
        return Err(SnapError::Config(format!(
            "repository path {} is not a valid btrfs folder",
            repo_path.display()
        )));
    }
    debug!("repository path {} is a valid btrfs folder", repo_path.display());

    Ok(RepositoryConfig {
        repository: repo_name.to_string(),
        path: repo_path.to_path_buf(),
        level: level_name.clone(),
        frequency,
        unit,
        link_path: link.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    use crate::error::SnapResult;
    use crate::storage::backend::{CommandOutcome, VolumeBackend};

    /// Treats every existing path as a valid btrfs volume.
    struct ExistsBackend;

    impl VolumeBackend for ExistsBackend {
        fn verify_type(&self, path: &Path) -> bool {
            path.exists()
        }

        fn create_snapshot(&self, _: &Path, _: &Path) -> SnapResult<CommandOutcome> {
            unreachable!("loader never creates snapshots")
        }

        fn delete_snapshot(&self, _: &Path) -> SnapResult<CommandOutcome> {
            unreachable!("loader never deletes snapshots")
        }
    }

    fn test_fixtures(temp: &TempDir) -> (SnapshotStore, StatusStore) {
        (
            SnapshotStore::new(Arc::new(ExistsBackend)),
            StatusStore::new(temp.path().join("status.json")),
        )
    }

    fn write_config(temp: &TempDir, contents: &str) -> PathBuf {
        let path = temp.path().join("config.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn valid_config_json(temp: &TempDir) -> String {
        format!(
            r#"{{
                "repositories": [
                    {{
                        "name": "data",
                        "path": "{path}",
                        "snapshot_levels": [
                            {{ "name": "hourly", "frequency": 4, "unit": "hour",
                               "link": "{path}/latest" }}
                        ]
                    }}
                ],
                "stoppers": ["{path}/disable"]
            }}"#,
            path = temp.path().display()
        )
    }

    #[test]
    fn test_load_valid_configuration() {
        let temp = TempDir::new().unwrap();
        let (store, status) = test_fixtures(&temp);
        let config_file = write_config(&temp, &valid_config_json(&temp));

        let config = load(&config_file, &store, &status).unwrap();

        assert_eq!(config.repositories.len(), 1);
        assert_eq!(config.stoppers.len(), 1);

        let repo = &config.repositories[0];
        assert_eq!(repo.full_name(), "data:hourly");
        assert_eq!(repo.frequency, 4);
        assert_eq!(repo.unit, TimeUnit::Hour);
        assert!(!status.snapshot().has_configuration_error);
    }

    #[test]
    fn test_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let (store, status) = test_fixtures(&temp);

        let err = load(&temp.path().join("absent.json"), &store, &status).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_repository_without_name_is_skipped() {
        let temp = TempDir::new().unwrap();
        let (store, status) = test_fixtures(&temp);
        let config_file = write_config(
            &temp,
            &format!(
                r#"{{
                    "repositories": [
                        {{ "path": "{path}",
                           "snapshot_levels": [
                               {{ "name": "hourly", "frequency": 1, "unit": "hour",
                                  "link": "{path}/latest" }} ] }},
                        {{ "name": "data", "path": "{path}",
                           "snapshot_levels": [
                               {{ "name": "daily", "frequency": 1, "unit": "day",
                                  "link": "{path}/latest" }} ] }}
                    ],
                    "stoppers": []
                }}"#,
                path = temp.path().display()
            ),
        );

        let config = load(&config_file, &store, &status).unwrap();

        assert_eq!(config.repositories.len(), 1);
        assert_eq!(config.repositories[0].full_name(), "data:daily");
        assert!(status.snapshot().has_configuration_error);
    }

    #[test]
    fn test_unknown_unit_is_skipped() {
        let temp = TempDir::new().unwrap();
        let (store, status) = test_fixtures(&temp);
        let config_file = write_config(
            &temp,
            &format!(
                r#"{{
                    "repositories": [
                        {{ "name": "data", "path": "{path}",
                           "snapshot_levels": [
                               {{ "name": "a", "frequency": 1, "unit": "fortnight",
                                  "link": "{path}/latest" }},
                               {{ "name": "b", "frequency": 1, "unit": "min",
                                  "link": "{path}/latest" }} ] }}
                    ],
                    "stoppers": []
                }}"#,
                path = temp.path().display()
            ),
        );

        let config = load(&config_file, &store, &status).unwrap();

        assert_eq!(config.repositories.len(), 1);
        assert_eq!(config.repositories[0].level, "b");
        assert!(status
            .snapshot()
            .configuration_error_reason
            .contains("unknown unit"));
    }

    #[test]
    fn test_zero_frequency_is_skipped() {
        let temp = TempDir::new().unwrap();
        let (store, status) = test_fixtures(&temp);
        let config_file = write_config(
            &temp,
            &format!(
                r#"{{
                    "repositories": [
                        {{ "name": "data", "path": "{path}",
                           "snapshot_levels": [
                               {{ "name": "a", "frequency": 0, "unit": "min",
                                  "link": "{path}/latest" }} ] }}
                    ],
                    "stoppers": []
                }}"#,
                path = temp.path().display()
            ),
        );

        assert!(load(&config_file, &store, &status).is_err());
        assert!(status.snapshot().has_configuration_error);
    }

    #[test]
    fn test_empty_link_is_skipped() {
        let temp = TempDir::new().unwrap();
        let (store, status) = test_fixtures(&temp);
        let config_file = write_config(
            &temp,
            &format!(
                r#"{{
                    "repositories": [
                        {{ "name": "data", "path": "{path}",
                           "snapshot_levels": [
                               {{ "name": "a", "frequency": 1, "unit": "min",
                                  "link": "" }} ] }}
                    ],
                    "stoppers": []
                }}"#,
                path = temp.path().display()
            ),
        );

        assert!(load(&config_file, &store, &status).is_err());
        assert!(status
            .snapshot()
            .configuration_error_reason
            .contains("empty link"));
    }

    #[test]
    fn test_non_btrfs_path_is_skipped() {
        let temp = TempDir::new().unwrap();
        let (store, status) = test_fixtures(&temp);
        let config_file = write_config(
            &temp,
            r#"{
                "repositories": [
                    { "name": "data", "path": "/nonexistent/volume",
                      "snapshot_levels": [
                          { "name": "a", "frequency": 1, "unit": "min",
                            "link": "/nonexistent/latest" } ] }
                ],
                "stoppers": []
            }"#,
        );

        assert!(load(&config_file, &store, &status).is_err());
        assert!(status
            .snapshot()
            .configuration_error_reason
            .contains("not a valid btrfs folder"));
    }

    #[test]
    fn test_missing_stoppers_section_recorded() {
        let temp = TempDir::new().unwrap();
        let (store, status) = test_fixtures(&temp);
        let config_file = write_config(
            &temp,
            &format!(
                r#"{{
                    "repositories": [
                        {{ "name": "data", "path": "{path}",
                           "snapshot_levels": [
                               {{ "name": "hourly", "frequency": 1, "unit": "hour",
                                  "link": "{path}/latest" }} ] }}
                    ]
                }}"#,
                path = temp.path().display()
            ),
        );

        let config = load(&config_file, &store, &status).unwrap();

        assert!(config.stoppers.is_empty());
        assert!(status
            .snapshot()
            .configuration_error_reason
            .contains("stopper section"));
    }
}

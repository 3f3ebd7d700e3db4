//! Path management for btrsnapd
//!
//! Resolves where the daemon keeps its mutable state (status record, lock
//! file) and where it looks for its configuration file.
//!
//! ## Path Resolution Order
//!
//! 1. `BTRSNAPD_STATE_DIR` environment variable (if set)
//! 2. `/var/lib/btrsnapd`
//!
//! The configuration file defaults to `/etc/btrsnapd/config.json` and can
//! be overridden on the command line or via `BTRSNAPD_CONFIG`.

use std::path::PathBuf;

use crate::error::SnapError;

/// Default directory for the status record and lock file
const DEFAULT_STATE_DIR: &str = "/var/lib/btrsnapd";

/// Default configuration file location
const DEFAULT_CONFIG_FILE: &str = "/etc/btrsnapd/config.json";

/// Manages all paths used by btrsnapd
#[derive(Debug, Clone)]
pub struct SnapPaths {
    /// Directory for the daemon's mutable state
    state_dir: PathBuf,
}

impl SnapPaths {
    /// Create a new SnapPaths instance
    ///
    /// Uses `BTRSNAPD_STATE_DIR` when set, `/var/lib/btrsnapd` otherwise.
    pub fn new() -> Self {
        let state_dir = if let Ok(custom) = std::env::var("BTRSNAPD_STATE_DIR") {
            PathBuf::from(custom)
        } else {
            PathBuf::from(DEFAULT_STATE_DIR)
        };

        Self { state_dir }
    }

    /// Create SnapPaths with a custom state directory (useful for testing)
    pub fn with_state_dir(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }

    /// Get the state directory
    pub fn state_dir(&self) -> &PathBuf {
        &self.state_dir
    }

    /// Get the path of the externally consumed status record
    pub fn status_file(&self) -> PathBuf {
        self.state_dir.join("status.json")
    }

    /// Get the path of the single-instance lock file
    pub fn lock_file(&self) -> PathBuf {
        self.state_dir.join("btrsnapd.lock")
    }

    /// Resolve the configuration file path, preferring an explicit override
    pub fn config_file(&self, cli_override: Option<PathBuf>) -> PathBuf {
        cli_override.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Ensure the state directory exists
    pub fn ensure_directories(&self) -> Result<(), SnapError> {
        std::fs::create_dir_all(&self.state_dir)
            .map_err(|e| SnapError::Io(format!("Failed to create state directory: {}", e)))?;
        Ok(())
    }
}

impl Default for SnapPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_state_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SnapPaths::with_state_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.state_dir(), temp_dir.path());
        assert_eq!(paths.status_file(), temp_dir.path().join("status.json"));
        assert_eq!(paths.lock_file(), temp_dir.path().join("btrsnapd.lock"));
    }

    #[test]
    fn test_config_file_override() {
        let paths = SnapPaths::with_state_dir(PathBuf::from("/tmp/x"));

        assert_eq!(
            paths.config_file(None),
            PathBuf::from("/etc/btrsnapd/config.json")
        );
        assert_eq!(
            paths.config_file(Some(PathBuf::from("/tmp/conf.json"))),
            PathBuf::from("/tmp/conf.json")
        );
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SnapPaths::with_state_dir(temp_dir.path().join("nested").join("state"));

        paths.ensure_directories().unwrap();

        assert!(paths.state_dir().exists());
    }
}

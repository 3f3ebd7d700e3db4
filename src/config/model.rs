//! Core configuration entities
//!
//! A `RepositoryConfig` describes one monitored btrfs volume together with
//! one named retention level. Entries are built once at load time and are
//! immutable for the daemon's lifetime.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Folder under the repository path that holds all snapshot levels
pub const SNAPSHOT_SUBFOLDER: &str = "snapshots";

/// Granularity of a repository's recurring schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Fires on seconds matching `sec % frequency == 0`
    Sec,
    /// Fires on minute boundaries matching `min % frequency == 0`
    Min,
    /// Fires on hour boundaries matching `hour % frequency == 0`
    Hour,
    /// Fires at midnight on days matching `(day - 1) % frequency == 0`
    Day,
}

impl TimeUnit {
    /// Parse the configuration-file spelling of a unit
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s {
            "sec" => Some(Self::Sec),
            "min" => Some(Self::Min),
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            _ => None,
        }
    }

    /// Configuration-file spelling of this unit
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sec => "sec",
            Self::Min => "min",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }

    /// Length of `frequency` units in whole seconds
    pub fn period_seconds(&self, frequency: u32) -> i64 {
        let unit_seconds: i64 = match self {
            Self::Sec => 1,
            Self::Min => 60,
            Self::Hour => 60 * 60,
            Self::Day => 60 * 60 * 24,
        };
        unit_seconds * i64::from(frequency)
    }
}

/// One monitored volume plus one retention level
///
/// Invariants (enforced by the loader before an entry enters the active
/// set): `link_path` is non-empty and `path` verified as a btrfs volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Repository name from the configuration file
    pub repository: String,
    /// Path of the monitored volume
    pub path: PathBuf,
    /// Name of the retention level (one folder per level)
    pub level: String,
    /// Recurring frequency, in `unit` granularity; always positive
    pub frequency: u32,
    /// Granularity of the recurring schedule
    pub unit: TimeUnit,
    /// Location of the "latest" symlink maintained for this level
    pub link_path: PathBuf,
}

impl RepositoryConfig {
    /// `repository:level` identifier used in logs and job names
    pub fn full_name(&self) -> String {
        format!("{}:{}", self.repository, self.level)
    }

    /// Root folder holding every level of this repository
    pub fn snapshot_root(&self) -> PathBuf {
        self.path.join(SNAPSHOT_SUBFOLDER)
    }

    /// Folder holding this level's snapshots
    pub fn level_dir(&self) -> PathBuf {
        self.snapshot_root().join(&self.level)
    }

    /// Absolute on-disk path of one snapshot of this level
    pub fn snapshot_path(&self, snapshot_name: &str) -> PathBuf {
        self.level_dir().join(snapshot_name)
    }

    /// Length of one scheduling period in whole seconds
    pub fn period_seconds(&self) -> i64 {
        self.unit.period_seconds(self.frequency)
    }
}

impl std::fmt::Display for RepositoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Repository ({}):", self.full_name())?;
        writeln!(f, "\tRepository Name: {}", self.repository)?;
        writeln!(f, "\tRepository Path: {}", self.path.display())?;
        writeln!(f, "\tSnapshot Level: {}", self.level)?;
        writeln!(f, "\tSnapshot Frequency: {}", self.frequency)?;
        writeln!(f, "\tSnapshot Time Unit: {}", self.unit.as_str())?;
        write!(f, "\tSnapshot Link: {}", self.link_path.display())
    }
}

/// True for a path built from an empty string
pub fn is_empty_path(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

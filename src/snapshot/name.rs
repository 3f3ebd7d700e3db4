//! Snapshot naming and ordering
//!
//! A snapshot is identified by a name embedding its creation timestamp at
//! second precision: `snapshot-YYYY-MM-DD_HH-MM-SS`. The format is fixed
//! width, so lexicographic order on the name equals chronological order;
//! the total order used throughout the crate is nevertheless derived from
//! the parsed timestamp, never from the string.

use chrono::{Local, NaiveDateTime, Timelike};

use crate::error::{SnapError, SnapResult};

/// Prefix of every snapshot folder name
pub const SNAPSHOT_PREFIX: &str = "snapshot-";

/// Timestamp layout embedded in snapshot names
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// A snapshot identifier with its embedded creation timestamp
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SnapshotName {
    // Field order matters: ordering derives from the timestamp first.
    created_at: NaiveDateTime,
    name: String,
}

impl SnapshotName {
    /// Build a name for the given creation timestamp
    pub fn for_timestamp(created_at: NaiveDateTime) -> Self {
        let name = format!(
            "{}{}",
            SNAPSHOT_PREFIX,
            created_at.format(TIMESTAMP_FORMAT)
        );
        Self { created_at, name }
    }

    /// Build a name for the current wall-clock time, second precision
    pub fn now() -> Self {
        let now = Local::now().naive_local();
        // Truncate sub-second precision so the name round-trips exactly.
        Self::for_timestamp(now.with_nanosecond(0).unwrap_or(now))
    }

    /// Parse a folder name back into a snapshot identifier
    ///
    /// A malformed name is an error; the caller decides whether that is a
    /// skippable condition (it never is during listing).
    pub fn parse(name: &str) -> SnapResult<Self> {
        let timestamp = name.strip_prefix(SNAPSHOT_PREFIX).ok_or_else(|| {
            SnapError::Runtime(format!(
                "snapshot name '{}' does not start with '{}'",
                name, SNAPSHOT_PREFIX
            ))
        })?;

        let created_at = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| {
                SnapError::Runtime(format!("malformed snapshot name '{}': {}", name, e))
            })?;

        Ok(Self {
            created_at,
            name: name.to_string(),
        })
    }

    /// The folder name as written on disk
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The creation timestamp embedded in the name
    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }
}

impl std::fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_format() {
        let name = SnapshotName::for_timestamp(timestamp(2020, 1, 5, 13, 7, 9));
        assert_eq!(name.as_str(), "snapshot-2020-01-05_13-07-09");
    }

    #[test]
    fn test_round_trip() {
        let original = timestamp(2023, 12, 31, 23, 59, 59);
        let name = SnapshotName::for_timestamp(original);
        let parsed = SnapshotName::parse(name.as_str()).unwrap();

        assert_eq!(parsed.created_at(), original);
        assert_eq!(parsed, name);
    }

    #[test]
    fn test_parse_rejects_missing_prefix() {
        assert!(SnapshotName::parse("2020-01-01_00-00-00").is_err());
        assert!(SnapshotName::parse("backup-2020-01-01_00-00-00").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed_timestamp() {
        assert!(SnapshotName::parse("snapshot-2020-13-01_00-00-00").is_err());
        assert!(SnapshotName::parse("snapshot-notadate").is_err());
        assert!(SnapshotName::parse("snapshot-").is_err());
    }

    #[test]
    fn test_ordering_matches_chronology() {
        let older = SnapshotName::for_timestamp(timestamp(2020, 1, 1, 0, 0, 0));
        let newer = SnapshotName::for_timestamp(timestamp(2020, 1, 2, 0, 0, 0));

        assert!(older < newer);
        // Lexicographic order on the fixed-width names agrees.
        assert!(older.as_str() < newer.as_str());
    }

    #[test]
    fn test_now_has_second_precision() {
        let name = SnapshotName::now();
        let parsed = SnapshotName::parse(name.as_str()).unwrap();
        assert_eq!(parsed.created_at(), name.created_at());
    }
}

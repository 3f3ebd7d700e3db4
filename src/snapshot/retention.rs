//! Retention policy
//!
//! Pure decision function bounding how many snapshots survive a rotation.
//! The policy keeps the newest two snapshots of a level; with fewer than
//! three present nothing is deleted, so a level always accumulates a
//! usable pair before rotation begins. Actual deletion side effects are
//! performed by the caller, in the order this plan dictates.

use crate::snapshot::name::SnapshotName;

/// Number of snapshots a normal rotation leaves behind
pub const RETAINED_PER_LEVEL: usize = 2;

/// Outcome of a retention decision
///
/// Both lists are in ascending (oldest first) order. `expired` must be
/// executed oldest first so that a partial deletion failure leaves the
/// newest survivors intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Snapshots that remain after the rotation
    pub survivors: Vec<SnapshotName>,
    /// Snapshots to delete, oldest first
    pub expired: Vec<SnapshotName>,
}

/// Decide which snapshots to delete from a time-ordered list
///
/// `ordered` must be sorted ascending by creation time. With `force_all`
/// set, every snapshot expires (used by the delete-all operation).
pub fn plan(ordered: &[SnapshotName], force_all: bool) -> RetentionPlan {
    if force_all {
        return RetentionPlan {
            survivors: Vec::new(),
            expired: ordered.to_vec(),
        };
    }

    if ordered.len() <= RETAINED_PER_LEVEL {
        return RetentionPlan {
            survivors: ordered.to_vec(),
            expired: Vec::new(),
        };
    }

    let cut = ordered.len() - RETAINED_PER_LEVEL;
    RetentionPlan {
        survivors: ordered[cut..].to_vec(),
        expired: ordered[..cut].to_vec(),
    }
}

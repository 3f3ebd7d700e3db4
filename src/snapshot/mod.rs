//! Snapshot lifecycle for btrsnapd
//!
//! Naming and ordering, the snapshot store, the retention policy, and
//! the "latest" pointer management.
//!
//! # Layout
//!
//! Snapshots live under `<repository>/snapshots/<level>/`, one folder
//! per snapshot, named `snapshot-YYYY-MM-DD_HH-MM-SS`. A rotation keeps
//! the newest two snapshots of a level and redirects the level's
//! symlink in two phases: first at the previous survivor, then — half a
//! scheduling period later — at the newest one.

pub mod name;
pub mod pointer;
pub mod retention;
pub mod store;

pub use name::{SnapshotName, SNAPSHOT_PREFIX};
pub use pointer::PointerManager;
pub use retention::{RetentionPlan, RETAINED_PER_LEVEL};
pub use store::SnapshotStore;

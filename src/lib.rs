//! btrsnapd - Scheduled snapshot rotation daemon for btrfs volumes
//!
//! This library provides the core functionality of the btrsnapd daemon.
//! It periodically creates point-in-time snapshots of configured btrfs
//! volumes, enforces a retention policy bounding how many snapshots are
//! kept per volume, and maintains a stable "latest snapshot" symlink
//! that downstream consumers can dereference without knowing the
//! current snapshot's name.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration entities, loading and path management
//! - `error`: Custom error types
//! - `state`: Health state machine, status record, disable gate
//! - `storage`: Filesystem capability interface and btrfs implementation
//! - `snapshot`: Naming, store, retention policy and pointer management
//! - `scheduler`: Recurring-fire computation and the dispatch engine
//! - `daemon`: Rotation cycle orchestration and the main control loop
//! - `lock`: Single-instance guard
//!
//! # Example
//!
//! ```rust,ignore
//! use btrsnapd::config::{loader, SnapPaths};
//! use btrsnapd::snapshot::SnapshotStore;
//!
//! let paths = SnapPaths::new();
//! let config = loader::load(&paths.config_file(None), &store, &status)?;
//! ```

pub mod config;
pub mod daemon;
pub mod error;
pub mod lock;
pub mod scheduler;
pub mod snapshot;
pub mod state;
pub mod storage;

pub use error::{SnapError, SnapResult};

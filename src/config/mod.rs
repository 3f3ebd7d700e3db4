//! Configuration module for btrsnapd
//!
//! This module provides configuration management including:
//! - Repository/level entities and time units
//! - JSON configuration loading with per-entry validation
//! - State and configuration path resolution

pub mod loader;
pub mod model;
pub mod paths;

pub use loader::DaemonConfig;
pub use model::{RepositoryConfig, TimeUnit};
pub use paths::SnapPaths;

//! Custom error types for btrsnapd
//!
//! This module defines the error hierarchy for the daemon using thiserror
//! for ergonomic error definitions. Errors fall into three families that
//! drive different policies: configuration errors (skip the offending
//! entry, keep loading), runtime errors (record and continue the current
//! job), and fatal errors (persist status, exit with a distinct code).

use thiserror::Error;

/// The main error type for btrsnapd operations
#[derive(Error, Debug)]
pub enum SnapError {
    /// Configuration-related errors (bad entry, unreadable file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Runtime errors during a rotation (snapshot create/delete failures,
    /// unexpected survivor cardinality)
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Errors from the storage backend (external command invocation)
    #[error("Storage error: {0}")]
    Storage(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Another daemon instance already holds the lock
    #[error("Lock error: {0}")]
    Lock(String),

    /// Required privilege is missing
    #[error("Privilege error: {0}")]
    Privilege(String),

    /// Scheduler errors (failed registration, dead dispatch thread)
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl SnapError {
    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a runtime error
    pub fn is_runtime(&self) -> bool {
        matches!(self, Self::Runtime(_) | Self::Storage(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for SnapError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SnapError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for btrsnapd operations
pub type SnapResult<T> = Result<T, SnapError>;

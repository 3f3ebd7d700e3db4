//! Service health state machine and its persisted status record
//!
//! The daemon keeps a single process-wide `ServiceState` behind a
//! `StatusStore`. Every mutation goes through the store, which holds the
//! state under a mutex and rewrites the full status record (atomic
//! overwrite, last-write-wins) after each transition so that external
//! monitoring can always distinguish "running degraded" from "stopped".

use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::storage::file_io;

/// Operational status of the daemon
///
/// `Down` is the initial state and the state entered on any startup or
/// configuration failure. `Up` is entered after successful load and job
/// registration. `Suspended` is entered whenever at least one sentinel
/// path exists at gate-check time. `Stopped` is terminal, entered on a
/// termination signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Up,
    Down,
    Suspended,
    Stopped,
}

/// The externally persisted representation of the daemon's health
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceState {
    /// Current operational status
    pub status: ServiceStatus,
    /// Whether a configuration error has been recorded
    #[serde(rename = "hasConfigurationError")]
    pub has_configuration_error: bool,
    /// Reason text of the last configuration error
    #[serde(rename = "configurationErrorReason")]
    pub configuration_error_reason: String,
    /// Whether a runtime error has been recorded
    #[serde(rename = "hasRuntimeError")]
    pub has_runtime_error: bool,
    /// Reason text of the last runtime error
    #[serde(rename = "runtimeErrorReason")]
    pub runtime_error_reason: String,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self {
            status: ServiceStatus::Down,
            has_configuration_error: false,
            configuration_error_reason: String::new(),
            has_runtime_error: false,
            runtime_error_reason: String::new(),
        }
    }
}

/// Owns the process-wide `ServiceState` and persists it on every change
///
/// This is the single synchronization point for state mutation; no other
/// component touches the record directly.
pub struct StatusStore {
    status_file: PathBuf,
    state: Mutex<ServiceState>,
}

impl StatusStore {
    /// Create a store that persists to the given status file
    pub fn new(status_file: PathBuf) -> Self {
        Self {
            status_file,
            state: Mutex::new(ServiceState::default()),
        }
    }

    /// Transition the operational status and persist the full record
    pub fn set_status(&self, status: ServiceStatus) {
        let mut state = self.lock();
        state.status = status;
        self.persist(&state);
    }

    /// Record a configuration error and persist the full record
    pub fn record_config_error(&self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("configuration error: {}", reason);
        let mut state = self.lock();
        state.has_configuration_error = true;
        state.configuration_error_reason = reason;
        self.persist(&state);
    }

    /// Record a runtime error and persist the full record
    pub fn record_runtime_error(&self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("runtime error: {}", reason);
        let mut state = self.lock();
        state.has_runtime_error = true;
        state.runtime_error_reason = reason;
        self.persist(&state);
    }

    /// Transition to a status while also recording a configuration error
    pub fn fail_down(&self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("entering down state: {}", reason);
        let mut state = self.lock();
        state.status = ServiceStatus::Down;
        state.has_configuration_error = true;
        state.configuration_error_reason = reason;
        self.persist(&state);
    }

    /// Get a copy of the current state
    pub fn snapshot(&self) -> ServiceState {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ServiceState> {
        // A poisoned mutex only means a job thread panicked mid-update;
        // the record itself is still coherent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, state: &ServiceState) {
        info!("writing current status ({:?})", state.status);
        if let Err(e) = file_io::write_json_atomic(&self.status_file, state) {
            warn!(
                "failed to persist status record to {}: {}",
                self.status_file.display(),
                e
            );
        }
    }
}

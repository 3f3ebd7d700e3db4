//! Sentinel-file disable gate
//!
//! The configuration names a list of "stopper" paths. The mere existence
//! of any of them at gate-check time suspends all scheduling; the gate is
//! evaluated on every job firing before any mutating action, and its
//! result drives the `up`/`suspended` status transition.

use std::path::PathBuf;

use tracing::debug;

use crate::state::status::{ServiceStatus, StatusStore};

/// Evaluates the sentinel list against the filesystem
#[derive(Debug, Clone, Default)]
pub struct DisableGate {
    stoppers: Vec<PathBuf>,
}

impl DisableGate {
    pub fn new(stoppers: Vec<PathBuf>) -> Self {
        Self { stoppers }
    }

    /// Returns true iff at least one sentinel path exists right now
    ///
    /// Always updates and persists the service status: `Suspended` when a
    /// sentinel is present, `Up` otherwise.
    pub fn is_disabled(&self, status: &StatusStore) -> bool {
        debug!("checking whether scheduling is suspended");

        for stopper in &self.stoppers {
            if stopper.exists() {
                debug!("sentinel file {} exists", stopper.display());
                status.set_status(ServiceStatus::Suspended);
                return true;
            }
        }

        status.set_status(ServiceStatus::Up);
        false
    }
}

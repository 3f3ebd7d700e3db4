//! Job scheduling for btrsnapd
//!
//! Cron-style recurring fire computation and the dispatch engine that
//! drives rotation and deferred link-update jobs.

pub mod engine;
pub mod timing;

pub use engine::{Scheduler, SchedulerHandle};

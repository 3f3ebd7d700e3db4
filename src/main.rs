//! btrsnapd entry point
//!
//! Exit statuses:
//!
//! - `0`  — clean daemon shutdown, successful `--check` or `--delete-all`
//! - `10` — another instance already holds the lock
//! - `11` — configuration load failure (or zero valid repositories)
//! - `12` — root privilege missing at startup
//! - `1`  — any other fatal error (scheduler startup failure)

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use btrsnapd::config::{loader, SnapPaths};
use btrsnapd::daemon::{self, SnapContext};
use btrsnapd::lock::InstanceGuard;
use btrsnapd::snapshot::{PointerManager, SnapshotStore};
use btrsnapd::state::{ServiceStatus, StatusStore};
use btrsnapd::storage::BtrfsBackend;

/// Exit status when another instance already holds the lock
const EXIT_ALREADY_RUNNING: i32 = 10;
/// Exit status on configuration load failure
const EXIT_CONFIG_FAILURE: i32 = 11;
/// Exit status when root privilege is missing at startup
const EXIT_NO_PRIVILEGE: i32 = 12;

#[derive(Parser)]
#[command(
    name = "btrsnapd",
    version,
    about = "Scheduled snapshot rotation daemon for btrfs volumes",
    long_about = "btrsnapd periodically snapshots configured btrfs volumes, keeps \
                  the newest two snapshots per retention level, and maintains a \
                  stable 'latest' symlink for each level. Scheduling can be \
                  suspended at any time by creating one of the configured \
                  stopper files."
)]
struct Cli {
    /// Validate the configuration file, print the active set and exit
    #[arg(short, long)]
    check: bool,

    /// Delete all snapshots and latest links for every repository, then exit
    #[arg(short = 'd', long = "delete-all")]
    delete_all: bool,

    /// Configuration file path
    #[arg(value_name = "CONFIG_FILE", env = "BTRSNAPD_CONFIG")]
    config_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let paths = SnapPaths::new();
    let status = Arc::new(StatusStore::new(paths.status_file()));
    let store = SnapshotStore::new(Arc::new(BtrfsBackend::new()));
    let config_file = paths.config_file(cli.config_file.clone());

    // Dry-run validation needs neither root nor the instance lock.
    if cli.check {
        match loader::load(&config_file, &store, &status) {
            Ok(config) => {
                println!("Configuration:");
                for repository in &config.repositories {
                    println!("{}", repository);
                }
                process::exit(0);
            }
            Err(e) => {
                eprintln!("{}", e);
                process::exit(EXIT_CONFIG_FAILURE);
            }
        }
    }

    // Both remaining modes mutate the filesystem through the btrfs
    // tools: require root, then the instance lock, before loading
    // anything else.
    let privileged = nix::unistd::Uid::effective().is_root();
    if !privileged {
        error!("only root can run the snapshot daemon");
        status.record_runtime_error("started without root privileges");
        process::exit(EXIT_NO_PRIVILEGE);
    }

    let _guard = match InstanceGuard::acquire(&paths.lock_file()) {
        Ok(guard) => guard,
        Err(e) => {
            error!("{}", e);
            eprintln!("there is another instance of btrsnapd running");
            process::exit(EXIT_ALREADY_RUNNING);
        }
    };

    let config = match loader::load(&config_file, &store, &status) {
        Ok(config) => config,
        Err(e) => {
            status.fail_down(e.to_string());
            eprintln!("{}", e);
            process::exit(EXIT_CONFIG_FAILURE);
        }
    };

    let pointer = PointerManager::new(privileged);
    let ctx = SnapContext::new(config, store, pointer, Arc::clone(&status));

    if cli.delete_all {
        daemon::delete_all(&ctx);
        process::exit(0);
    }

    if let Err(e) = daemon::run(ctx) {
        status.record_runtime_error(format!("failed to start: {}", e));
        status.set_status(ServiceStatus::Down);
        return Err(e.into());
    }

    Ok(())
}

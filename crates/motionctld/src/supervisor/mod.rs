//! Lifecycle management for the motion daemon.
//!
//! The [`Supervisor`] validates the daemon configuration, spawns the daemon
//! in background mode, waits for it to write a fresh PID file and open its
//! webcontrol port, and stops it with `SIGTERM` followed by `SIGKILL` once
//! the grace period runs out. While the daemon runs, configuration calls are
//! forwarded over webcontrol.

mod controller;
mod error;
mod handle;
mod monitoring;
mod output;
mod shutdown;
mod spawning;
mod types;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub use controller::Supervisor;
pub use error::SupervisorError;
pub use output::running_cameras;
pub use types::{DaemonCommand, ProcessState, StatusSnapshot, SupervisorSettings};

pub(crate) const SUPERVISOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::supervisor");
pub(crate) const OUTPUT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::motion");

/// Interval between readiness and exit probes.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(200);
/// How long to wait for the daemon to disappear after `SIGKILL`.
pub(crate) const KILL_TIMEOUT: Duration = Duration::from_secs(2);

/// Locks `mutex`, recovering the guard if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

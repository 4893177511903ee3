//! Graceful termination of the daemon with a forced fallback.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{debug, warn};

use super::error::SupervisorError;
use super::handle::ProcessHandle;
use super::monitoring::PidFile;
use super::{KILL_TIMEOUT, POLL_INTERVAL, SUPERVISOR_TARGET, lock, millis};

/// How the daemon ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopOutcome {
    /// The daemon exited after `SIGTERM`, or was already gone.
    Graceful,
    /// The daemon had to be killed.
    Forced,
}

/// Sends `SIGTERM`, waits up to `grace`, then escalates to `SIGKILL`.
///
/// A forced stop leaves the daemon no chance to clean up, so the PID file is
/// removed here.
pub(crate) fn stop_daemon(
    handle: &Mutex<ProcessHandle>,
    pid: u32,
    pid_file: &PidFile,
    grace: Duration,
) -> Result<StopOutcome, SupervisorError> {
    if !send_signal(pid, Signal::SIGTERM)? {
        debug!(target: SUPERVISOR_TARGET, pid, "motion daemon already exited");
        return Ok(StopOutcome::Graceful);
    }
    if wait_for_exit(handle, pid, grace)? {
        return Ok(StopOutcome::Graceful);
    }
    warn!(
        target: SUPERVISOR_TARGET,
        pid,
        grace_ms = millis(grace),
        "motion daemon ignored SIGTERM; sending SIGKILL"
    );
    if send_signal(pid, Signal::SIGKILL)? && !wait_for_exit(handle, pid, KILL_TIMEOUT)? {
        return Err(SupervisorError::ShutdownTimeout {
            pid,
            timeout_ms: millis(grace + KILL_TIMEOUT),
        });
    }
    pid_file.remove()?;
    Ok(StopOutcome::Forced)
}

/// Delivers `signal`, returning `false` when the process no longer exists.
fn send_signal(pid: u32, signal: Signal) -> Result<bool, SupervisorError> {
    let target = signal_target(pid)?;
    match kill(target, signal) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(source) => Err(SupervisorError::SignalFailed {
            pid,
            signal,
            source,
        }),
    }
}

fn signal_target(pid: u32) -> Result<Pid, SupervisorError> {
    let invalid = |reason| SupervisorError::InvalidPid { pid, reason };
    match i32::try_from(pid) {
        Ok(0) => Err(invalid("pid 0 addresses the whole process group")),
        Ok(1) => Err(invalid("pid 1 is the init process")),
        Ok(raw) => Ok(Pid::from_raw(raw)),
        Err(_) => Err(invalid("pid exceeds the platform range")),
    }
}

fn wait_for_exit(
    handle: &Mutex<ProcessHandle>,
    pid: u32,
    timeout: Duration,
) -> Result<bool, SupervisorError> {
    let deadline = Instant::now() + timeout;
    loop {
        if !lock(handle).is_alive(pid)? {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

//! Ownership of the spawned daemon process and PID liveness checks.
//!
//! All OS-level process calls live here and in `shutdown`.

use std::process::{Child, ExitStatus};

use cap_std::ambient_authority;
use cap_std::fs::Dir;
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use super::error::SupervisorError;

/// The child spawned by the last start, if any.
///
/// Holding the [`Child`] lets liveness checks reap it, so a stopped daemon
/// that was our direct child never lingers as a zombie that `kill(pid, 0)`
/// would still report as alive.
#[derive(Debug, Default)]
pub(crate) struct ProcessHandle {
    child: Option<Child>,
}

impl ProcessHandle {
    pub(crate) fn spawned(child: Child) -> Self {
        Self { child: Some(child) }
    }

    /// Returns the exit status of the spawned child once it has exited.
    pub(crate) fn child_exit(&mut self) -> Result<Option<ExitStatus>, SupervisorError> {
        match self.child.as_mut() {
            Some(child) => child
                .try_wait()
                .map_err(|source| SupervisorError::MonitorChild { source }),
            None => Ok(None),
        }
    }

    /// Returns whether `pid` names a live process.
    pub(crate) fn is_alive(&mut self, pid: u32) -> Result<bool, SupervisorError> {
        if let Some(child) = self.child.as_mut()
            && child.id() == pid
        {
            return child
                .try_wait()
                .map(|status| status.is_none())
                .map_err(|source| SupervisorError::MonitorChild { source });
        }
        probe_process(pid)
    }

    /// Kills the spawned child if it is still running and reaps it.
    pub(crate) fn abandon(&mut self) {
        if let Some(mut child) = self.child.take()
            && matches!(child.try_wait(), Ok(None))
        {
            if let Err(error) = child.kill() {
                tracing::warn!(
                    target: super::SUPERVISOR_TARGET,
                    pid = child.id(),
                    %error,
                    "failed to kill abandoned motion process"
                );
            }
            if let Err(error) = child.wait() {
                tracing::warn!(
                    target: super::SUPERVISOR_TARGET,
                    pid = child.id(),
                    %error,
                    "failed to reap abandoned motion process"
                );
            }
        }
    }

    /// Drops the spawned child once it has exited and been reaped.
    pub(crate) fn release(&mut self) {
        if let Some(mut child) = self.child.take()
            && matches!(child.try_wait(), Ok(None))
        {
            self.child = Some(child);
        }
    }
}

/// Checks whether a process with `pid` exists using `kill(pid, 0)`.
///
/// `EPERM` means the process exists under another user. An exited process
/// that its parent has not reaped yet counts as gone.
pub(crate) fn probe_process(pid: u32) -> Result<bool, SupervisorError> {
    let Ok(raw) = i32::try_from(pid) else {
        return Ok(false);
    };
    if raw == 0 {
        return Ok(false);
    }
    match kill(Pid::from_raw(raw), None::<Signal>) {
        Ok(()) | Err(Errno::EPERM) => Ok(!is_zombie(pid)),
        Err(Errno::ESRCH) => Ok(false),
        Err(source) => Err(SupervisorError::CheckProcess { pid, source }),
    }
}

/// A daemon that forked away from us is reaped by init, which may lag.
/// Without `/proc` nothing is reported as a zombie.
fn is_zombie(pid: u32) -> bool {
    let Ok(proc_dir) = Dir::open_ambient_dir("/proc", ambient_authority()) else {
        return false;
    };
    proc_dir
        .read_to_string(format!("{pid}/stat"))
        .ok()
        .and_then(|stat| {
            stat.rsplit_once(')')
                .map(|(_, fields)| fields.trim_start().starts_with('Z'))
        })
        .unwrap_or(false)
}

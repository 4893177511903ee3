//! PID file access and readiness polling.

use std::ffi::OsStr;
use std::io;
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use cap_std::ambient_authority;
use cap_std::fs::Dir;
use tracing::debug;

use super::error::SupervisorError;
use super::handle::ProcessHandle;
use super::{POLL_INTERVAL, SUPERVISOR_TARGET, lock, millis};

const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// The daemon's PID file, resolved through a directory handle on its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the PID, returning `None` when the file is missing or empty.
    pub(crate) fn read(&self) -> Result<Option<u32>, SupervisorError> {
        let read_error = |source| SupervisorError::ReadPid {
            path: self.path.clone(),
            source,
        };
        let Some((dir, name)) = self.open_parent().map_err(read_error)? else {
            return Ok(None);
        };
        let content = match dir.read_to_string(name) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(read_error(source)),
        };
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed
            .parse::<u32>()
            .map(Some)
            .map_err(|source| SupervisorError::ParsePid {
                path: self.path.clone(),
                source,
            })
    }

    /// Returns whether the file was written no earlier than `started_at`.
    ///
    /// File times are compared at second precision so a file written in the
    /// same second as the spawn still counts.
    pub(crate) fn is_recent(&self, started_at: SystemTime) -> Result<bool, SupervisorError> {
        let read_error = |source| SupervisorError::ReadPid {
            path: self.path.clone(),
            source,
        };
        let Some((dir, name)) = self.open_parent().map_err(read_error)? else {
            return Ok(false);
        };
        let modified = match dir.metadata(name).and_then(|metadata| metadata.modified()) {
            Ok(modified) => modified.into_std(),
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(source) => return Err(read_error(source)),
        };
        Ok(unix_seconds(modified) >= unix_seconds(started_at))
    }

    /// Deletes the file; a missing file is not an error.
    pub(crate) fn remove(&self) -> Result<(), SupervisorError> {
        let remove_error = |source| SupervisorError::RemovePid {
            path: self.path.clone(),
            source,
        };
        let Some((dir, name)) = self.open_parent().map_err(remove_error)? else {
            return Ok(());
        };
        match dir.remove_file(name) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(remove_error(source)),
        }
    }

    fn open_parent(&self) -> io::Result<Option<(Dir, &OsStr)>> {
        let name = self.path.file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "pid file path has no file name")
        })?;
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        match Dir::open_ambient_dir(parent, ambient_authority()) {
            Ok(dir) => Ok(Some((dir, name))),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }
}

fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Returns whether something accepts TCP connections at `address`.
pub(crate) fn webcontrol_is_reachable(address: SocketAddr) -> Result<bool, SupervisorError> {
    match TcpStream::connect_timeout(&address, PROBE_TIMEOUT) {
        Ok(_) => Ok(true),
        Err(error) if is_not_listening(&error) => Ok(false),
        Err(source) => Err(SupervisorError::SocketProbe { address, source }),
    }
}

fn is_not_listening(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::TimedOut
    )
}

/// What the readiness loop watches after a spawn.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReadinessProbe<'a> {
    pub(crate) pid_file: &'a PidFile,
    pub(crate) webcontrol: SocketAddr,
    pub(crate) started_at: SystemTime,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ReadinessOutcome {
    Ready(u32),
    Continue,
}

/// Polls until the daemon is ready or `timeout` elapses.
///
/// The daemon is ready once a PID file written since the spawn names a live
/// process and the webcontrol port accepts connections. A spawned process
/// that exits cleanly has forked into the background, so polling continues;
/// a non-zero exit fails immediately.
pub(crate) fn wait_for_ready(
    handle: &Mutex<ProcessHandle>,
    probe: ReadinessProbe<'_>,
    timeout: Duration,
) -> Result<u32, SupervisorError> {
    let deadline = Instant::now() + timeout;
    let mut daemonized = false;
    while Instant::now() < deadline {
        if !daemonized && let Some(status) = lock(handle).child_exit()? {
            if !status.success() {
                return Err(SupervisorError::StartupFailed {
                    exit_status: status.code(),
                });
            }
            debug!(target: SUPERVISOR_TARGET, "spawned process exited cleanly; daemon forked");
            daemonized = true;
        }
        if let ReadinessOutcome::Ready(pid) = check_readiness(handle, probe)? {
            return Ok(pid);
        }
        thread::sleep(POLL_INTERVAL);
    }
    Err(SupervisorError::StartupTimeout {
        pid_path: probe.pid_file.path().to_path_buf(),
        timeout_ms: millis(timeout),
    })
}

pub(crate) fn check_readiness(
    handle: &Mutex<ProcessHandle>,
    probe: ReadinessProbe<'_>,
) -> Result<ReadinessOutcome, SupervisorError> {
    let pid = match probe.pid_file.read() {
        Ok(Some(pid)) => pid,
        // The daemon may be part-way through writing the file.
        Ok(None) | Err(SupervisorError::ParsePid { .. }) => return Ok(ReadinessOutcome::Continue),
        Err(error) => return Err(error),
    };
    if !probe.pid_file.is_recent(probe.started_at)? || !lock(handle).is_alive(pid)? {
        return Ok(ReadinessOutcome::Continue);
    }
    if !webcontrol_is_reachable(probe.webcontrol)? {
        return Ok(ReadinessOutcome::Continue);
    }
    Ok(ReadinessOutcome::Ready(pid))
}

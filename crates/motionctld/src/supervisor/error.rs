//! Error types for supervisor operations.

use std::ffi::OsString;
use std::io;
use std::net::SocketAddr;
use std::num::ParseIntError;
use std::path::PathBuf;

use motion_conf::LoadError;
use nix::errno::Errno;
use nix::sys::signal::Signal;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::webcontrol::WebControlError;

/// Errors raised while supervising the daemon.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The daemon configuration could not be read or failed validation.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// No daemon configuration path has been provided yet.
    #[error("no motion configuration has been loaded; call init first")]
    NoConfiguration,
    /// A daemon is already running.
    #[error("motion daemon is already running with pid {pid}")]
    AlreadyRunning {
        /// PID of the running daemon.
        pid: u32,
    },
    /// The daemon is not running.
    #[error("motion daemon is not running")]
    NotRunning,
    /// The daemon binary could not be found.
    #[error("motion binary '{binary:?}' not found: {source}")]
    BinaryNotFound {
        /// Binary that was looked up.
        binary: OsString,
        /// Lookup failure.
        #[source]
        source: which::Error,
    },
    /// The daemon binary could not be started.
    #[error("failed to spawn motion binary '{binary:?}': {source}")]
    LaunchDaemon {
        /// Binary that was executed.
        binary: OsString,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Waiting on the spawned child failed.
    #[error("failed to monitor motion daemon: {source}")]
    MonitorChild {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The spawned process exited unsuccessfully before becoming ready.
    #[error("motion daemon exited before becoming ready (status: {exit_status:?})")]
    StartupFailed {
        /// Exit code, if the process was not killed by a signal.
        exit_status: Option<i32>,
    },
    /// The daemon did not become ready in time.
    #[error("timed out after {timeout_ms} ms waiting for motion to write {pid_path:?} and accept webcontrol connections")]
    StartupTimeout {
        /// PID file that was polled.
        pid_path: PathBuf,
        /// Timeout that elapsed.
        timeout_ms: u64,
    },
    /// The PID file exists but could not be read.
    #[error("failed to read pid file {path:?}: {source}")]
    ReadPid {
        /// PID file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The PID file does not contain a decimal PID.
    #[error("failed to parse pid file {path:?}: {source}")]
    ParsePid {
        /// PID file path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: ParseIntError,
    },
    /// The PID cannot be signalled safely.
    #[error("refusing to signal pid {pid}: {reason}")]
    InvalidPid {
        /// Offending PID.
        pid: u32,
        /// Why it was refused.
        reason: &'static str,
    },
    /// Probing a PID for liveness failed.
    #[error("failed to check whether pid {pid} is alive: {source}")]
    CheckProcess {
        /// Probed PID.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// A signal could not be delivered.
    #[error("failed to send {signal:?} to pid {pid}: {source}")]
    SignalFailed {
        /// Target PID.
        pid: u32,
        /// Signal that was sent.
        signal: Signal,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// The daemon survived `SIGKILL`.
    #[error("motion daemon pid {pid} did not exit within {timeout_ms} ms")]
    ShutdownTimeout {
        /// Daemon PID.
        pid: u32,
        /// Time waited in total.
        timeout_ms: u64,
    },
    /// The PID file could not be removed after a forced stop.
    #[error("failed to remove pid file {path:?}: {source}")]
    RemovePid {
        /// PID file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Probing the webcontrol port failed unexpectedly.
    #[error("failed to probe webcontrol at {address}: {source}")]
    SocketProbe {
        /// Probed address.
        address: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A webcontrol request failed.
    #[error(transparent)]
    WebControl(#[from] WebControlError),
}

impl SupervisorError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Load(LoadError::Parse(_)) => ErrorKind::Io,
            Self::Load(LoadError::Invalid { .. }) | Self::NoConfiguration => ErrorKind::Config,
            Self::AlreadyRunning { .. } => ErrorKind::AlreadyRunning,
            Self::NotRunning => ErrorKind::NotRunning,
            Self::WebControl(error) => error.kind(),
            Self::BinaryNotFound { .. }
            | Self::LaunchDaemon { .. }
            | Self::MonitorChild { .. }
            | Self::StartupFailed { .. }
            | Self::StartupTimeout { .. }
            | Self::ReadPid { .. }
            | Self::ParsePid { .. }
            | Self::InvalidPid { .. }
            | Self::CheckProcess { .. }
            | Self::SignalFailed { .. }
            | Self::ShutdownTimeout { .. }
            | Self::RemovePid { .. }
            | Self::SocketProbe { .. } => ErrorKind::Process,
        }
    }
}

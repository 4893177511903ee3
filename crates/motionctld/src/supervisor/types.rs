use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use motionctl_config::Config;
use serde::Serialize;

use super::spawning::resolve_motion_binary;

/// Lifecycle state of the supervised daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// No start has been attempted.
    NotStarted,
    /// The daemon has been spawned and is not ready yet.
    Starting,
    /// The daemon is ready and accepts webcontrol requests.
    Running,
    /// A stop is in progress.
    Stopping,
    /// The daemon was stopped.
    Stopped,
    /// The last start or stop failed.
    Failed,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotStarted => "not_started",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        formatter.write_str(label)
    }
}

/// Program and leading arguments used to launch the daemon.
///
/// `-c <config>` is appended at spawn time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl DaemonCommand {
    /// Runs `program` with no leading arguments.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends a leading argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Runs the configured motion binary in background mode, honouring the
    /// binary override environment variable.
    #[must_use]
    pub fn motion(config: &Config) -> Self {
        Self::new(resolve_motion_binary(&config.motion_binary)).arg("-b")
    }

    /// Program to execute.
    #[must_use]
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Leading arguments.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }
}

/// Timeouts and launch command used by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// How the daemon is launched.
    pub command: DaemonCommand,
    /// Bound on readiness polling after spawn.
    pub startup_timeout: Duration,
    /// Time between `SIGTERM` and `SIGKILL`.
    pub shutdown_grace: Duration,
    /// Detection flag applied when `init` autostarts the daemon.
    pub detection_on_boot: bool,
}

impl SupervisorSettings {
    /// Derives settings from the service configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            command: DaemonCommand::motion(config),
            startup_timeout: config.startup_timeout(),
            shutdown_grace: config.shutdown_grace(),
            detection_on_boot: config.detection_on_boot,
        }
    }
}

/// Point-in-time view of the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    /// Current lifecycle state.
    pub state: ProcessState,
    /// PID of the running daemon.
    pub pid: Option<u32>,
    /// Detection flag used by the last start.
    pub detection_on_boot: bool,
    /// Daemon configuration path passed to `init`.
    pub config_path: Option<PathBuf>,
    /// Camera count announced by the daemon, when it printed its banner.
    pub cameras: Option<u32>,
}

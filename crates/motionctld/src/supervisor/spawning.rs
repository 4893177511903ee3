//! Daemon process spawning utilities.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use motionctl_config::MOTION_BINARY_ENV;

use super::error::SupervisorError;
use super::types::DaemonCommand;

/// Spawns the daemon with `-c <config_path>` appended to `command`.
///
/// Output is piped so it can be forwarded into the supervisor's log.
pub(super) fn spawn_daemon(
    command: &DaemonCommand,
    config_path: &Path,
) -> Result<Child, SupervisorError> {
    let mut process = Command::new(command.program());
    process
        .args(command.args())
        .arg("-c")
        .arg(config_path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    process
        .spawn()
        .map_err(|source| SupervisorError::LaunchDaemon {
            binary: command.program().to_owned(),
            source,
        })
}

/// Resolves `program` the way a spawn would, through `PATH` unless it
/// contains a path separator.
pub(super) fn locate_binary(program: &OsStr) -> Result<PathBuf, SupervisorError> {
    which::which(program).map_err(|source| SupervisorError::BinaryNotFound {
        binary: program.to_owned(),
        source,
    })
}

/// Prefers the `MOTIONCTL_MOTION_BIN` override over the configured binary.
pub(super) fn resolve_motion_binary(configured: &str) -> OsString {
    env::var_os(MOTION_BINARY_ENV)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| OsString::from(configured))
}

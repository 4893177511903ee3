//! Error classification shared by the webcontrol client and the supervisor.

use std::fmt;

use serde::Serialize;

/// Coarse category of a failure, used by callers to pick a response.
///
/// Every error also carries a human-readable reason through `Display`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// File access failed.
    Io,
    /// The daemon configuration is missing or invalid.
    Config,
    /// Spawning, signalling or waiting on the daemon failed.
    Process,
    /// The webcontrol interface was unreachable or refused a request.
    Remote,
    /// The daemon did not report the requested key.
    NotFound,
    /// The daemon is already running.
    AlreadyRunning,
    /// The daemon is not running.
    NotRunning,
    /// The key may not be changed at runtime.
    Permission,
    /// A key or value used characters outside the safe token class.
    InvalidInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Io => "io",
            Self::Config => "config",
            Self::Process => "process",
            Self::Remote => "remote",
            Self::NotFound => "not_found",
            Self::AlreadyRunning => "already_running",
            Self::NotRunning => "not_running",
            Self::Permission => "permission",
            Self::InvalidInput => "invalid_input",
        };
        formatter.write_str(label)
    }
}

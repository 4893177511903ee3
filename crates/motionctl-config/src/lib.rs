//! Layered configuration for the motion supervisor service.
//!
//! Values resolve in order of increasing precedence: built-in defaults, a
//! `.motionctl.toml` file, `MOTIONCTL_*` environment variables and finally
//! command-line flags. Loading is delegated to [`ortho_config`].
//!
//! This configuration belongs to the supervisor. The daemon's own
//! `motion.conf` is only referenced by path and is read by `motion-conf`.

mod defaults;
mod logging;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_MOTION_BINARY, DEFAULT_MOTION_CONFIG_FILE,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SHUTDOWN_GRACE_MS, DEFAULT_STARTUP_TIMEOUT_MS,
    MOTION_BINARY_ENV, default_log_filter, default_log_filter_string, default_log_format,
    default_motion_binary, default_motion_config_file,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(prefix = "MOTIONCTL")]
pub struct Config {
    /// Path of the daemon's native configuration file.
    pub motion_config_file: PathBuf,
    /// Start the daemon as soon as the configuration has been loaded.
    pub autostart: bool,
    /// Abort the service when the daemon configuration fails validation.
    pub strict: bool,
    /// Enable motion detection once an autostarted daemon is ready.
    pub detection_on_boot: bool,
    /// Daemon executable, resolved through `PATH` when not absolute.
    pub motion_binary: String,
    /// Milliseconds to wait for the daemon to become ready.
    pub startup_timeout_ms: u64,
    /// Milliseconds to wait after `SIGTERM` before killing the daemon.
    pub shutdown_grace_ms: u64,
    /// Milliseconds before a webcontrol request is abandoned.
    pub request_timeout_ms: u64,
    /// `tracing` filter expression.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            motion_config_file: default_motion_config_file(),
            autostart: false,
            strict: false,
            detection_on_boot: false,
            motion_binary: default_motion_binary(),
            startup_timeout_ms: defaults::default_startup_timeout_ms(),
            shutdown_grace_ms: defaults::default_shutdown_grace_ms(),
            request_timeout_ms: defaults::default_request_timeout_ms(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments, environment and
    /// configuration file.
    ///
    /// # Errors
    ///
    /// Returns an [`OrthoError`] when a layer cannot be read or parsed.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration using `args` in place of the process arguments.
    ///
    /// # Errors
    ///
    /// Returns an [`OrthoError`] when a layer cannot be read or parsed.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Path of the daemon's native configuration file.
    #[must_use]
    pub fn motion_config_file(&self) -> &Path {
        &self.motion_config_file
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Readiness timeout for a freshly spawned daemon.
    #[must_use]
    pub const fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    /// Grace period between `SIGTERM` and `SIGKILL`.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Timeout for a single webcontrol request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

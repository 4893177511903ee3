use std::path::PathBuf;

use crate::logging::LogFormat;

/// Default location of the daemon's native configuration file.
pub const DEFAULT_MOTION_CONFIG_FILE: &str = "/etc/motion/motion.conf";

/// Daemon executable looked up on `PATH` when no override is configured.
pub const DEFAULT_MOTION_BINARY: &str = "motion";

/// Environment variable that overrides the configured daemon binary.
pub const MOTION_BINARY_ENV: &str = "MOTIONCTL_MOTION_BIN";

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Time allowed for the daemon to become ready after spawning.
pub const DEFAULT_STARTUP_TIMEOUT_MS: u64 = 30_000;

/// Time allowed for the daemon to exit after `SIGTERM` before it is killed.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 10_000;

/// Timeout applied to every webcontrol request.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Default daemon configuration path.
pub fn default_motion_config_file() -> PathBuf {
    PathBuf::from(DEFAULT_MOTION_CONFIG_FILE)
}

/// Default daemon binary.
pub fn default_motion_binary() -> String {
    DEFAULT_MOTION_BINARY.to_owned()
}

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

pub(crate) const fn default_startup_timeout_ms() -> u64 {
    DEFAULT_STARTUP_TIMEOUT_MS
}

pub(crate) const fn default_shutdown_grace_ms() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_MS
}

pub(crate) const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

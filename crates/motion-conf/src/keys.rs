//! Well-known configuration keys.

/// TCP port of the webcontrol interface.
pub const WEBCONTROL_PORT: &str = "webcontrol_port";
/// TCP port of the MJPEG stream.
pub const STREAM_PORT: &str = "stream_port";
/// Whether webcontrol answers with HTML pages instead of plain text.
pub const WEBCONTROL_HTML_OUTPUT: &str = "webcontrol_html_output";
/// Webcontrol parameter visibility and native authentication level.
pub const WEBCONTROL_PARMS: &str = "webcontrol_parms";
/// Native webcontrol credentials.
pub const WEBCONTROL_AUTHENTICATION: &str = "webcontrol_authentication";
/// Native stream authentication method.
pub const STREAM_AUTH_METHOD: &str = "stream_auth_method";
/// Native stream credentials.
pub const STREAM_AUTHENTICATION: &str = "stream_authentication";
/// File the daemon writes its PID to.
pub const PROCESS_ID_FILE: &str = "process_id_file";
/// Whether the daemon forks into the background.
pub const DAEMON: &str = "daemon";
/// Camera setup mode.
pub const SETUP_MODE: &str = "setup_mode";
/// Pauses motion detection while `on`.
pub const PAUSE: &str = "pause";
/// Daemon log verbosity.
pub const LOG_LEVEL: &str = "log_level";

/// Keys that may never be changed through the control surface.
///
/// Covers every key the validator depends on, plus `daemon` (changing it
/// breaks signal-based shutdown) and `setup_mode`.
pub const READ_ONLY_KEYS: [&str; 10] = [
    WEBCONTROL_PORT,
    STREAM_PORT,
    WEBCONTROL_HTML_OUTPUT,
    WEBCONTROL_PARMS,
    WEBCONTROL_AUTHENTICATION,
    STREAM_AUTH_METHOD,
    STREAM_AUTHENTICATION,
    PROCESS_ID_FILE,
    DAEMON,
    SETUP_MODE,
];

/// Returns true when `key` may be set at runtime.
#[must_use]
pub fn is_settable(key: &str) -> bool {
    !READ_ONLY_KEYS.contains(&key)
}

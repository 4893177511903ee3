//! Structured reporting for supervisor lifecycle events.

use std::path::Path;
use std::sync::Arc;

use motion_conf::ValidatedConfig;

use crate::supervisor::{DaemonCommand, SupervisorError};

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait SupervisorReporter: Send + Sync {
    /// Invoked when a daemon configuration passes validation.
    fn config_loaded(&self, config: &ValidatedConfig);

    /// Invoked when a daemon configuration cannot be read or is rejected.
    fn config_rejected(&self, path: &Path, error: &SupervisorError);

    /// Invoked before the daemon is spawned.
    fn daemon_starting(&self, command: &DaemonCommand, config_path: &Path);

    /// Invoked once the daemon process exists.
    fn daemon_spawned(&self, pid: u32);

    /// Invoked when the daemon is ready for webcontrol requests.
    fn daemon_ready(&self, pid: u32);

    /// Invoked when a ready daemon refused the requested detection state.
    fn detection_failed(&self, enabled: bool, error: &SupervisorError);

    /// Invoked when a start fails after the configuration was accepted.
    fn startup_failed(&self, error: &SupervisorError);

    /// Invoked before the daemon is signalled to stop.
    fn daemon_stopping(&self, pid: u32);

    /// Invoked after the daemon has exited.
    fn daemon_stopped(&self, pid: u32, forced: bool);

    /// Invoked when the daemon could not be stopped.
    fn shutdown_failed(&self, pid: u32, error: &SupervisorError);
}

impl<T> SupervisorReporter for Arc<T>
where
    T: SupervisorReporter,
{
    fn config_loaded(&self, config: &ValidatedConfig) {
        (**self).config_loaded(config);
    }

    fn config_rejected(&self, path: &Path, error: &SupervisorError) {
        (**self).config_rejected(path, error);
    }

    fn daemon_starting(&self, command: &DaemonCommand, config_path: &Path) {
        (**self).daemon_starting(command, config_path);
    }

    fn daemon_spawned(&self, pid: u32) {
        (**self).daemon_spawned(pid);
    }

    fn daemon_ready(&self, pid: u32) {
        (**self).daemon_ready(pid);
    }

    fn detection_failed(&self, enabled: bool, error: &SupervisorError) {
        (**self).detection_failed(enabled, error);
    }

    fn startup_failed(&self, error: &SupervisorError) {
        (**self).startup_failed(error);
    }

    fn daemon_stopping(&self, pid: u32) {
        (**self).daemon_stopping(pid);
    }

    fn daemon_stopped(&self, pid: u32, forced: bool) {
        (**self).daemon_stopped(pid, forced);
    }

    fn shutdown_failed(&self, pid: u32, error: &SupervisorError) {
        (**self).shutdown_failed(pid, error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredSupervisorReporter;

impl StructuredSupervisorReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SupervisorReporter for StructuredSupervisorReporter {
    fn config_loaded(&self, config: &ValidatedConfig) {
        tracing::info!(
            target: "motionctld::supervisor",
            event = "config_loaded",
            path = %config.path().display(),
            webcontrol_port = config.webcontrol_port(),
            stream_port = config.stream_port(),
            pid_file = %config.pid_file().display(),
            "motion configuration accepted"
        );
    }

    fn config_rejected(&self, path: &Path, error: &SupervisorError) {
        tracing::error!(
            target: "motionctld::supervisor",
            event = "config_rejected",
            path = %path.display(),
            kind = %error.kind(),
            error = %error,
            "motion configuration rejected"
        );
    }

    fn daemon_starting(&self, command: &DaemonCommand, config_path: &Path) {
        tracing::info!(
            target: "motionctld::supervisor",
            event = "daemon_starting",
            program = ?command.program(),
            args = ?command.args(),
            config = %config_path.display(),
            "starting motion daemon"
        );
    }

    fn daemon_spawned(&self, pid: u32) {
        tracing::debug!(
            target: "motionctld::supervisor",
            event = "daemon_spawned",
            pid,
            "motion process spawned"
        );
    }

    fn daemon_ready(&self, pid: u32) {
        tracing::info!(
            target: "motionctld::supervisor",
            event = "daemon_ready",
            pid,
            "motion daemon ready"
        );
    }

    fn detection_failed(&self, enabled: bool, error: &SupervisorError) {
        tracing::warn!(
            target: "motionctld::supervisor",
            event = "detection_failed",
            enabled,
            kind = %error.kind(),
            error = %error,
            "motion daemon is running but detection could not be applied"
        );
    }

    fn startup_failed(&self, error: &SupervisorError) {
        tracing::error!(
            target: "motionctld::supervisor",
            event = "startup_failed",
            kind = %error.kind(),
            error = %error,
            "motion daemon failed to start"
        );
    }

    fn daemon_stopping(&self, pid: u32) {
        tracing::info!(
            target: "motionctld::supervisor",
            event = "daemon_stopping",
            pid,
            "stopping motion daemon"
        );
    }

    fn daemon_stopped(&self, pid: u32, forced: bool) {
        tracing::info!(
            target: "motionctld::supervisor",
            event = "daemon_stopped",
            pid,
            forced,
            "motion daemon stopped"
        );
    }

    fn shutdown_failed(&self, pid: u32, error: &SupervisorError) {
        tracing::error!(
            target: "motionctld::supervisor",
            event = "shutdown_failed",
            pid,
            error = %error,
            "motion daemon could not be stopped"
        );
    }
}

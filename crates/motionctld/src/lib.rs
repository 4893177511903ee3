//! Supervisor for the motion video-surveillance daemon.
//!
//! The crate validates the daemon's native configuration with
//! [`motion_conf`], launches the daemon as a child process, confirms that it
//! is ready by watching its PID file and webcontrol port, and stops it with
//! escalating signals. While the daemon runs, the [`Supervisor`] forwards
//! configuration queries and changes to it through the plain-text webcontrol
//! interface implemented in [`webcontrol`].
//!
//! Every failure carries an [`ErrorKind`] so callers can tell a missing
//! configuration apart from an unreachable daemon or a refused change.
//!
//! The `motionctld` binary wraps the supervisor in a service that reads
//! [`motionctl_config::Config`], optionally autostarts the daemon, reloads on
//! `SIGHUP`, and stops the daemon when a termination signal arrives.

mod error;
mod reporter;
mod service;
pub mod supervisor;
mod telemetry;
pub mod webcontrol;

pub use error::ErrorKind;
pub use reporter::{StructuredSupervisorReporter, SupervisorReporter};
pub use service::{
    ServiceError, ServiceSignal, SignalError, SignalSource, SystemSignals, run_service,
    run_service_with,
};
pub use supervisor::{
    DaemonCommand, ProcessState, StatusSnapshot, Supervisor, SupervisorError, SupervisorSettings,
};
pub use telemetry::TelemetryError;

#[cfg(test)]
mod tests;

//! Runs the supervisor as a long-lived service.

mod signals;

use std::sync::Arc;

use motionctl_config::Config;
use thiserror::Error;
use tracing::{info, warn};

use crate::reporter::{StructuredSupervisorReporter, SupervisorReporter};
use crate::supervisor::{ProcessState, Supervisor, SupervisorError};
use crate::telemetry::{self, TelemetryError};

pub use signals::{ServiceSignal, SignalError, SignalSource, SystemSignals};

pub(crate) const SERVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::service");

/// Errors that end the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Logging could not be configured.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// The supervisor could not be constructed.
    #[error("failed to prepare the supervisor: {source}")]
    Setup {
        /// Underlying supervisor error.
        #[source]
        source: SupervisorError,
    },
    /// The daemon configuration or binary was rejected in strict mode.
    #[error("motion configuration rejected: {source}")]
    Init {
        /// Underlying supervisor error.
        #[source]
        source: SupervisorError,
    },
    /// Listening for signals failed.
    #[error(transparent)]
    Signal(#[from] SignalError),
    /// The daemon could not be stopped on exit.
    #[error("failed to stop motion daemon: {source}")]
    Stop {
        /// Underlying supervisor error.
        #[source]
        source: SupervisorError,
    },
}

/// Runs the service with production collaborators until a termination
/// signal arrives.
///
/// # Errors
///
/// See [`run_service_with`].
pub fn run_service(config: &Config) -> Result<(), ServiceError> {
    telemetry::initialise(config)?;
    let signals = SystemSignals::install()?;
    let reporter: Arc<dyn SupervisorReporter> = Arc::new(StructuredSupervisorReporter::new());
    let supervisor = Supervisor::from_config(config, reporter)
        .map_err(|source| ServiceError::Setup { source })?;
    run_service_with(config, &supervisor, &signals)
}

/// Initialises `supervisor` from `config` and serves signals from `signals`
/// until one asks the service to stop, then stops any running daemon.
///
/// `SIGHUP` revalidates the daemon configuration and restarts a running
/// daemon so it picks the file up.
///
/// # Errors
///
/// Fails when strict mode rejects the daemon configuration or binary, when
/// the signal listener fails, or when the daemon cannot be stopped. Other
/// start and reload failures are logged and the service keeps running.
pub fn run_service_with(
    config: &Config,
    supervisor: &Supervisor,
    signals: &dyn SignalSource,
) -> Result<(), ServiceError> {
    info!(
        target: SERVICE_TARGET,
        config = %config.motion_config_file().display(),
        autostart = config.autostart,
        strict = config.strict,
        "motion supervisor starting"
    );
    match supervisor.init(config.motion_config_file(), config.autostart, config.strict) {
        Ok(()) => {}
        Err(source @ (SupervisorError::Load(_) | SupervisorError::BinaryNotFound { .. }))
            if config.strict =>
        {
            return Err(ServiceError::Init { source });
        }
        Err(error) => warn!(
            target: SERVICE_TARGET,
            kind = %error.kind(),
            %error,
            "motion daemon not started"
        ),
    }

    let signal = loop {
        match signals.next_signal()? {
            ServiceSignal::Reload => reload(config, supervisor),
            ServiceSignal::Stop(signal) => break signal,
        }
    };
    info!(target: SERVICE_TARGET, signal, "stop signal received");

    match supervisor.shutdown() {
        Ok(()) | Err(SupervisorError::NotRunning) => {}
        Err(source) => return Err(ServiceError::Stop { source }),
    }
    info!(target: SERVICE_TARGET, "shutdown sequence completed");
    Ok(())
}

fn reload(config: &Config, supervisor: &Supervisor) {
    info!(target: SERVICE_TARGET, "reloading motion configuration");
    let result = supervisor
        .init(config.motion_config_file(), false, true)
        .and_then(|()| {
            if supervisor.state() == ProcessState::Running {
                supervisor.restart()
            } else {
                Ok(())
            }
        });
    if let Err(error) = result {
        warn!(
            target: SERVICE_TARGET,
            kind = %error.kind(),
            %error,
            "reload failed; keeping the current daemon"
        );
    }
}

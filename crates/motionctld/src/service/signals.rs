//! Process signals that steer the service.

use std::io;
use std::sync::Mutex;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;

use crate::supervisor::lock;

/// What the service should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceSignal {
    /// Revalidate the daemon configuration and restart a running daemon.
    Reload,
    /// Stop the daemon and exit; carries the signal number received.
    Stop(i32),
}

impl ServiceSignal {
    /// Maps a raw signal number; `SIGHUP` reloads, anything else stops.
    #[must_use]
    pub const fn from_raw(signal: i32) -> Self {
        if signal == SIGHUP {
            Self::Reload
        } else {
            Self::Stop(signal)
        }
    }
}

/// Source of service signals.
pub trait SignalSource: Send + Sync {
    /// Blocks until the next signal arrives.
    ///
    /// # Errors
    ///
    /// Fails when the listener has been closed.
    fn next_signal(&self) -> Result<ServiceSignal, SignalError>;
}

/// Errors reported by signal listeners.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The listener stopped delivering signals.
    #[error("signal listener closed")]
    Closed,
}

/// Listens for `SIGTERM`, `SIGINT`, `SIGQUIT` and `SIGHUP`.
///
/// Handlers are installed once, so a `SIGHUP` arriving while a reload is in
/// progress is queued rather than terminating the process.
pub struct SystemSignals {
    signals: Mutex<Signals>,
}

impl SystemSignals {
    /// Installs the handlers.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Install`] when registration fails.
    pub fn install() -> Result<Self, SignalError> {
        let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| SignalError::Install { source })?;
        Ok(Self {
            signals: Mutex::new(signals),
        })
    }
}

impl std::fmt::Debug for SystemSignals {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("SystemSignals").finish_non_exhaustive()
    }
}

impl SignalSource for SystemSignals {
    fn next_signal(&self) -> Result<ServiceSignal, SignalError> {
        lock(&self.signals)
            .forever()
            .next()
            .map(ServiceSignal::from_raw)
            .ok_or(SignalError::Closed)
    }
}

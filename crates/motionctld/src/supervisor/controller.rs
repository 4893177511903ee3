//! The supervisor: owns the daemon lifecycle and brokers webcontrol calls.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use motion_conf::keys::PAUSE;
use motion_conf::{TypedConfigMap, TypedValue, ValidatedConfig, is_settable};
use motionctl_config::Config;
use tracing::{debug, info, warn};

use super::error::SupervisorError;
use super::handle::ProcessHandle;
use super::monitoring::{PidFile, ReadinessProbe, wait_for_ready};
use super::output::{CameraCount, forward_output};
use super::shutdown::{StopOutcome, stop_daemon};
use super::spawning::{locate_binary, spawn_daemon};
use super::types::{ProcessState, StatusSnapshot, SupervisorSettings};
use super::{SUPERVISOR_TARGET, lock};
use crate::reporter::SupervisorReporter;
use crate::webcontrol::{HttpTransport, ReqwestTransport, WebControlClient, WebControlError};

/// The daemon started by the last successful start.
#[derive(Debug, Clone)]
struct ActiveDaemon {
    pid: u32,
    pid_file: PathBuf,
    client: WebControlClient,
    cameras: CameraCount,
}

#[derive(Debug)]
struct Inner {
    state: ProcessState,
    config_path: Option<PathBuf>,
    config: Option<Arc<ValidatedConfig>>,
    detection_on_boot: bool,
    active: Option<ActiveDaemon>,
}

/// Supervises a single motion daemon.
///
/// Lifecycle transitions (`init`, `startup`, `shutdown`, `restart`) are
/// serialised. Queries and webcontrol calls only read the current state, so
/// they never wait behind a slow start.
pub struct Supervisor {
    settings: SupervisorSettings,
    transport: Arc<dyn HttpTransport>,
    reporter: Arc<dyn SupervisorReporter>,
    transition: Mutex<()>,
    inner: RwLock<Inner>,
    handle: Mutex<ProcessHandle>,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Supervisor")
            .field("settings", &self.settings)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Builds a supervisor that talks to the daemon through `transport`.
    #[must_use]
    pub fn new(
        settings: SupervisorSettings,
        transport: Arc<dyn HttpTransport>,
        reporter: Arc<dyn SupervisorReporter>,
    ) -> Self {
        let detection_on_boot = settings.detection_on_boot;
        Self {
            settings,
            transport,
            reporter,
            transition: Mutex::new(()),
            inner: RwLock::new(Inner {
                state: ProcessState::NotStarted,
                config_path: None,
                config: None,
                detection_on_boot,
                active: None,
            }),
            handle: Mutex::new(ProcessHandle::default()),
        }
    }

    /// Builds a supervisor with an HTTP transport bounded by the configured
    /// request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn from_config(
        config: &Config,
        reporter: Arc<dyn SupervisorReporter>,
    ) -> Result<Self, SupervisorError> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Ok(Self::new(
            SupervisorSettings::from_config(config),
            Arc::new(transport),
            reporter,
        ))
    }

    /// Records and validates the daemon configuration at `path` and checks
    /// that the daemon binary can be found.
    ///
    /// With `strict`, a rejected configuration or a missing binary is
    /// returned as an error. Otherwise it is logged and the path is kept, so
    /// a later start reports the problem again. With `autostart`, the daemon is then started using
    /// the configured detection flag.
    ///
    /// # Errors
    ///
    /// Returns the validation or lookup error in strict mode, or any start
    /// error.
    pub fn init(&self, path: &Path, autostart: bool, strict: bool) -> Result<(), SupervisorError> {
        let _transition = lock(&self.transition);
        self.write().config_path = Some(path.to_path_buf());
        match self.load_config(path) {
            Ok(_) => {}
            Err(error) if strict => return Err(error),
            Err(error) => warn!(
                target: SUPERVISOR_TARGET,
                path = %path.display(),
                %error,
                "continuing with a rejected motion configuration"
            ),
        }
        match locate_binary(self.settings.command.program()) {
            Ok(binary) => debug!(
                target: SUPERVISOR_TARGET,
                binary = %binary.display(),
                "motion binary located"
            ),
            Err(error) if strict => return Err(error),
            Err(error) => warn!(target: SUPERVISOR_TARGET, %error, "motion binary not found"),
        }
        if autostart {
            return self.startup_locked(self.settings.detection_on_boot);
        }
        Ok(())
    }

    /// Starts the daemon and waits until it is ready.
    ///
    /// The configuration is validated again first. Once the daemon is ready,
    /// detection is enabled or paused according to `enable_detection`; a
    /// daemon that refuses the change is reported but still counts as
    /// started. A daemon that forked but never became ready is stopped.
    ///
    /// # Errors
    ///
    /// Fails when no configuration was given, the configuration is invalid,
    /// a daemon is already running, or the daemon does not become ready.
    pub fn startup(&self, enable_detection: bool) -> Result<(), SupervisorError> {
        let _transition = lock(&self.transition);
        self.startup_locked(enable_detection)
    }

    /// Stops the running daemon, escalating to `SIGKILL` after the grace
    /// period.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::NotRunning`] when no daemon was started, or
    /// an error if the daemon could not be stopped.
    pub fn shutdown(&self) -> Result<(), SupervisorError> {
        let _transition = lock(&self.transition);
        self.shutdown_locked()
    }

    /// Stops and starts the daemon, keeping the detection flag of the last
    /// start. No other transition can interleave.
    ///
    /// # Errors
    ///
    /// Returns the first failing stop or start error.
    pub fn restart(&self) -> Result<(), SupervisorError> {
        let _transition = lock(&self.transition);
        let enable_detection = self.read().detection_on_boot;
        self.shutdown_locked()?;
        self.startup_locked(enable_detection)
    }

    /// Returns whether the PID file names a live process.
    ///
    /// # Errors
    ///
    /// Fails when the PID file exists but cannot be read or parsed, or when
    /// the liveness probe itself fails.
    pub fn is_started(&self) -> Result<bool, SupervisorError> {
        let pid_path = {
            let inner = self.read();
            inner
                .active
                .as_ref()
                .map(|active| active.pid_file.clone())
                .or_else(|| inner.config.as_ref().map(|config| config.pid_file().to_path_buf()))
        };
        let Some(path) = pid_path else {
            return Ok(false);
        };
        let Some(pid) = PidFile::new(path).read()? else {
            return Ok(false);
        };
        lock(&self.handle).is_alive(pid)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ProcessState {
        self.read().state
    }

    /// Point-in-time view of the supervisor.
    #[must_use]
    pub fn status(&self) -> StatusSnapshot {
        let inner = self.read();
        StatusSnapshot {
            state: inner.state,
            pid: inner.active.as_ref().map(|active| active.pid),
            detection_on_boot: inner.detection_on_boot,
            config_path: inner.config_path.clone(),
            cameras: inner
                .active
                .as_ref()
                .and_then(|active| active.cameras.get().copied()),
        }
    }

    /// Lists the running daemon's configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::NotRunning`] or the webcontrol failure.
    pub fn config_list(&self) -> Result<TypedConfigMap, SupervisorError> {
        Ok(self.client()?.list()?)
    }

    /// Reads one key from the running daemon.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::NotRunning`] or the webcontrol failure.
    pub fn config_get(&self, key: &str) -> Result<TypedValue, SupervisorError> {
        Ok(self.client()?.get(key)?)
    }

    /// Changes one key on the running daemon, optionally writing the
    /// configuration back to disk, and returns the typed value applied.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::NotRunning`] or the webcontrol failure,
    /// including refusals for read-only keys.
    pub fn config_set(
        &self,
        key: &str,
        value: &str,
        write_back: bool,
    ) -> Result<TypedValue, SupervisorError> {
        let client = self.client()?;
        client.set(key, value, is_settable)?;
        if write_back {
            client.write()?;
        }
        Ok(TypedValue::from_raw(value))
    }

    /// Asks the running daemon to write its configuration to disk.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::NotRunning`] or the webcontrol failure.
    pub fn config_write(&self) -> Result<(), SupervisorError> {
        Ok(self.client()?.write()?)
    }

    /// Enables or pauses motion detection on the running daemon.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::NotRunning`] or the webcontrol failure.
    pub fn enable_motion_detection(&self, enabled: bool) -> Result<(), SupervisorError> {
        apply_detection(&self.client()?, enabled)
    }

    /// Returns whether the running daemon has detection enabled.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::NotRunning`], the webcontrol failure, or
    /// an unexpected-value error when `pause` is not a boolean.
    pub fn is_motion_detection_enabled(&self) -> Result<bool, SupervisorError> {
        match self.client()?.get(PAUSE)? {
            TypedValue::Boolean(paused) => Ok(!paused),
            other => Err(WebControlError::UnexpectedValue {
                key: PAUSE.to_owned(),
                value: other.to_string(),
            }
            .into()),
        }
    }

    fn startup_locked(&self, enable_detection: bool) -> Result<(), SupervisorError> {
        let (config_path, previous) = {
            let inner = self.read();
            (inner.config_path.clone(), inner.active.clone())
        };
        if let Some(active) = previous {
            if lock(&self.handle).is_alive(active.pid)? {
                return Err(SupervisorError::AlreadyRunning { pid: active.pid });
            }
            warn!(
                target: SUPERVISOR_TARGET,
                pid = active.pid,
                "previous motion daemon exited unexpectedly"
            );
        }
        let config_path = config_path.ok_or(SupervisorError::NoConfiguration)?;
        let config = self.load_config(&config_path)?;
        let pid_file = PidFile::new(config.pid_file());
        self.ensure_no_live_daemon(&pid_file)?;
        let client = WebControlClient::for_port(Arc::clone(&self.transport), config.webcontrol_port())?;

        {
            let mut inner = self.write();
            inner.state = ProcessState::Starting;
            inner.active = None;
        }
        self.reporter.daemon_starting(&self.settings.command, &config_path);
        let started_at = SystemTime::now();
        let mut child = match spawn_daemon(&self.settings.command, &config_path) {
            Ok(child) => child,
            Err(error) => return Err(self.fail_startup(error)),
        };
        self.reporter.daemon_spawned(child.id());
        let cameras = forward_output(&mut child);
        {
            let mut handle = lock(&self.handle);
            handle.abandon();
            *handle = ProcessHandle::spawned(child);
        }

        let probe = ReadinessProbe {
            pid_file: &pid_file,
            webcontrol: config.webcontrol_address(),
            started_at,
        };
        let pid = match wait_for_ready(&self.handle, probe, self.settings.startup_timeout) {
            Ok(pid) => pid,
            Err(error) => {
                lock(&self.handle).abandon();
                let error = self.fail_startup(error);
                self.stop_unready_daemon(&pid_file, started_at, client, cameras);
                return Err(error);
            }
        };
        {
            let mut inner = self.write();
            inner.state = ProcessState::Running;
            inner.detection_on_boot = enable_detection;
            inner.active = Some(ActiveDaemon {
                pid,
                pid_file: pid_file.path().to_path_buf(),
                client: client.clone(),
                cameras,
            });
        }
        self.reporter.daemon_ready(pid);
        if let Err(error) = apply_detection(&client, enable_detection) {
            self.reporter.detection_failed(enable_detection, &error);
        }
        Ok(())
    }

    /// Stops a daemon that forked and wrote a fresh PID file but never became
    /// ready. A daemon that survives the attempt stays tracked so `shutdown`
    /// can retry.
    fn stop_unready_daemon(
        &self,
        pid_file: &PidFile,
        started_at: SystemTime,
        client: WebControlClient,
        cameras: CameraCount,
    ) {
        let pid = match self.unready_daemon_pid(pid_file, started_at) {
            Ok(Some(pid)) => pid,
            Ok(None) => return,
            Err(error) => {
                warn!(
                    target: SUPERVISOR_TARGET,
                    path = %pid_file.path().display(),
                    %error,
                    "could not check for a motion daemon left by the failed start"
                );
                return;
            }
        };
        self.reporter.daemon_stopping(pid);
        match stop_daemon(&self.handle, pid, pid_file, self.settings.shutdown_grace) {
            Ok(outcome) => self
                .reporter
                .daemon_stopped(pid, outcome == StopOutcome::Forced),
            Err(error) => {
                self.reporter.shutdown_failed(pid, &error);
                self.write().active = Some(ActiveDaemon {
                    pid,
                    pid_file: pid_file.path().to_path_buf(),
                    client,
                    cameras,
                });
            }
        }
    }

    fn unready_daemon_pid(
        &self,
        pid_file: &PidFile,
        started_at: SystemTime,
    ) -> Result<Option<u32>, SupervisorError> {
        if !pid_file.is_recent(started_at)? {
            return Ok(None);
        }
        let Some(pid) = pid_file.read()? else {
            return Ok(None);
        };
        Ok(lock(&self.handle).is_alive(pid)?.then_some(pid))
    }

    fn shutdown_locked(&self) -> Result<(), SupervisorError> {
        let active = self.read().active.clone().ok_or(SupervisorError::NotRunning)?;
        self.write().state = ProcessState::Stopping;
        self.reporter.daemon_stopping(active.pid);
        let pid_file = PidFile::new(&active.pid_file);
        match stop_daemon(&self.handle, active.pid, &pid_file, self.settings.shutdown_grace) {
            Ok(outcome) => {
                lock(&self.handle).release();
                {
                    let mut inner = self.write();
                    inner.state = ProcessState::Stopped;
                    inner.active = None;
                }
                self.reporter
                    .daemon_stopped(active.pid, outcome == StopOutcome::Forced);
                Ok(())
            }
            Err(error) => {
                self.write().state = ProcessState::Failed;
                self.reporter.shutdown_failed(active.pid, &error);
                Err(error)
            }
        }
    }

    /// Loads and stores the configuration, replacing whatever was stored.
    fn load_config(&self, path: &Path) -> Result<Arc<ValidatedConfig>, SupervisorError> {
        match motion_conf::load(path) {
            Ok(config) => {
                self.reporter.config_loaded(&config);
                let config = Arc::new(config);
                self.write().config = Some(Arc::clone(&config));
                Ok(config)
            }
            Err(source) => {
                let error = SupervisorError::Load(source);
                self.reporter.config_rejected(path, &error);
                self.write().config = None;
                Err(error)
            }
        }
    }

    fn ensure_no_live_daemon(&self, pid_file: &PidFile) -> Result<(), SupervisorError> {
        match pid_file.read() {
            Ok(Some(pid)) => {
                if lock(&self.handle).is_alive(pid)? {
                    return Err(SupervisorError::AlreadyRunning { pid });
                }
                info!(
                    target: SUPERVISOR_TARGET,
                    pid,
                    path = %pid_file.path().display(),
                    "ignoring stale pid file"
                );
                Ok(())
            }
            Ok(None) | Err(SupervisorError::ParsePid { .. }) => Ok(()),
            Err(error) => Err(error),
        }
    }

    fn fail_startup(&self, error: SupervisorError) -> SupervisorError {
        self.write().state = ProcessState::Failed;
        self.reporter.startup_failed(&error);
        error
    }

    fn client(&self) -> Result<WebControlClient, SupervisorError> {
        let inner = self.read();
        match (inner.state, inner.active.as_ref()) {
            (ProcessState::Running, Some(active)) => Ok(active.client.clone()),
            _ => Err(SupervisorError::NotRunning),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn apply_detection(client: &WebControlClient, enabled: bool) -> Result<(), SupervisorError> {
    let paused = if enabled { "off" } else { "on" };
    client.set(PAUSE, paused, is_settable)?;
    info!(target: SUPERVISOR_TARGET, enabled, "motion detection updated");
    Ok(())
}

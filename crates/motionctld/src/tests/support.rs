//! Test harness utilities for the supervisor behavioural suite.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use motion_conf::{TypedValue, ValidatedConfig};
use tempfile::TempDir;

use crate::reporter::SupervisorReporter;
use crate::supervisor::{DaemonCommand, Supervisor, SupervisorError, SupervisorSettings};
use crate::webcontrol::ReqwestTransport;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub fixture: MotionFixture,
    pub reporter: Arc<RecordingReporter>,
    pub supervisor: Supervisor,
    pub last_error: Option<SupervisorError>,
    pub last_value: Option<TypedValue>,
    pub detection: Option<bool>,
    pub first_pid: Option<u32>,
}

impl TestWorld {
    pub fn new() -> Self {
        let fixture = MotionFixture::new();
        fixture.write_config();
        let reporter = Arc::new(RecordingReporter::default());
        let supervisor = fixture.supervisor(Arc::clone(&reporter));
        Self {
            fixture,
            reporter,
            supervisor,
            last_error: None,
            last_value: None,
            detection: None,
            first_pid: None,
        }
    }

    /// Records the outcome of a supervisor call.
    pub fn record<T>(&mut self, result: Result<T, SupervisorError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Some(value)
            }
            Err(error) => {
                self.last_error = Some(error);
                None
            }
        }
    }

    pub fn init(&mut self, strict: bool) {
        let result = self
            .supervisor
            .init(&self.fixture.config_path(), false, strict);
        self.record(result);
    }

    pub fn startup(&mut self, enable_detection: bool) {
        let result = self.supervisor.startup(enable_detection);
        self.record(result);
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        let _ = self.supervisor.shutdown();
    }
}

pub fn world() -> std::cell::RefCell<TestWorld> {
    std::cell::RefCell::new(TestWorld::new())
}

const DAEMON_CONFIG: &str = "\
daemon off
log_level 6
stream_port 8081
webcontrol_html_output off
webcontrol_parms 2
stream_auth_method 0
";

/// Temporary directory holding a motion configuration, a stand-in daemon
/// script and the fake webcontrol server the configuration points at.
pub struct MotionFixture {
    dir: TempDir,
    pub webcontrol: FakeWebControl,
}

impl MotionFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let fixture = Self {
            dir,
            webcontrol: FakeWebControl::start(),
        };
        fixture.write_daemon_script();
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("motion.conf")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.path().join("motion.pid")
    }

    fn script_path(&self) -> PathBuf {
        self.path().join("fake-motion.sh")
    }

    /// Writes a configuration that passes validation.
    pub fn write_config(&self) {
        let contents = format!(
            "{DAEMON_CONFIG}webcontrol_port {}\nprocess_id_file {}\n",
            self.webcontrol.address().port(),
            self.pid_path().display()
        );
        fs::write(self.config_path(), contents).expect("write motion.conf");
    }

    /// Writes a configuration whose webcontrol port nothing listens on.
    pub fn write_config_with_closed_webcontrol(&self) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);
        let contents = format!(
            "{DAEMON_CONFIG}webcontrol_port {port}\nprocess_id_file {}\n",
            self.pid_path().display()
        );
        fs::write(self.config_path(), contents).expect("write motion.conf");
    }

    /// Writes a configuration without a webcontrol port.
    pub fn write_config_without_webcontrol(&self) {
        let contents = format!(
            "{DAEMON_CONFIG}process_id_file {}\n",
            self.pid_path().display()
        );
        fs::write(self.config_path(), contents).expect("write motion.conf");
    }

    /// Writes the PID of a process that has already exited.
    pub fn write_stale_pid(&self) {
        let mut child = Command::new("/bin/sh")
            .arg("-c")
            .arg("exit 0")
            .spawn()
            .expect("spawn shell");
        let pid = child.id();
        child.wait().expect("wait");
        fs::write(self.pid_path(), format!("{pid}\n")).expect("write pid");
    }

    fn write_daemon_script(&self) {
        let script = format!(
            "#!/bin/sh\n\
             echo '[0:motion] [NTC] [ALL] motion_startup: Motion 4.3.2 Running [1] Camera'\n\
             echo $$ > '{}'\n\
             exec sleep 30\n",
            self.pid_path().display()
        );
        fs::write(self.script_path(), script).expect("write daemon script");
    }

    /// Replaces the stand-in daemon with one that forks into the background
    /// like `motion -b` and leaves the spawned process to exit at once.
    pub fn write_forking_daemon_script(&self) {
        let script = format!(
            "#!/bin/sh\n\
             /bin/sh -c 'echo $$ > \"$0\"; exec sleep 30' '{}' >/dev/null 2>&1 &\n\
             exit 0\n",
            self.pid_path().display()
        );
        fs::write(self.script_path(), script).expect("write daemon script");
    }

    pub fn settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            command: DaemonCommand::new("/bin/sh").arg(self.script_path()),
            startup_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(2),
            detection_on_boot: false,
        }
    }

    pub fn supervisor(&self, reporter: Arc<RecordingReporter>) -> Supervisor {
        self.supervisor_with(self.settings(), reporter)
    }

    pub fn supervisor_with(
        &self,
        settings: SupervisorSettings,
        reporter: Arc<RecordingReporter>,
    ) -> Supervisor {
        let transport = ReqwestTransport::new(Duration::from_secs(2)).expect("http client");
        Supervisor::new(settings, Arc::new(transport), reporter)
    }
}

/// Minimal plain-text webcontrol server backed by an in-memory key store.
pub struct FakeWebControl {
    address: SocketAddr,
    store: Arc<Mutex<BTreeMap<String, String>>>,
    requests: Arc<Mutex<Vec<String>>>,
    reject_sets: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl FakeWebControl {
    pub fn start() -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind webcontrol");
        let address = listener.local_addr().expect("webcontrol address");
        let store = Arc::new(Mutex::new(BTreeMap::from([
            ("log_level".to_owned(), "6".to_owned()),
            ("pause".to_owned(), "off".to_owned()),
            ("webcontrol_port".to_owned(), address.port().to_string()),
        ])));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let reject_sets = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));

        let server = (
            Arc::clone(&store),
            Arc::clone(&requests),
            Arc::clone(&reject_sets),
            Arc::clone(&stop),
        );
        thread::spawn(move || {
            let (store, requests, reject_sets, stop) = server;
            for stream in listener.incoming() {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                if let Ok(stream) = stream {
                    serve(&stream, &store, &requests, reject_sets.load(Ordering::SeqCst));
                }
            }
        });

        Self {
            address,
            store,
            requests,
            reject_sets,
            stop,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.store.lock().expect("store mutex poisoned").get(key).cloned()
    }

    /// Answers later `set` requests without echoing the new value.
    pub fn reject_sets(&self) {
        self.reject_sets.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests mutex poisoned").clone()
    }
}

impl Drop for FakeWebControl {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = TcpStream::connect(self.address);
    }
}

fn serve(
    stream: &TcpStream,
    store: &Mutex<BTreeMap<String, String>>,
    requests: &Mutex<Vec<String>>,
    reject_sets: bool,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    if !matches!(reader.read_line(&mut request_line), Ok(read) if read > 0) {
        // Readiness probes connect and hang up without a request.
        return;
    }
    let mut header = String::new();
    loop {
        header.clear();
        match reader.read_line(&mut header) {
            Ok(0) | Err(_) => break,
            Ok(_) if header.trim().is_empty() => break,
            Ok(_) => {}
        }
    }

    let target = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_owned();
    requests
        .lock()
        .expect("requests mutex poisoned")
        .push(target.clone());
    let (status, body) = respond(&target, store, reject_sets);
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let mut writer = stream;
    let _ = writer.write_all(response.as_bytes());
    let _ = writer.flush();
}

fn respond(
    target: &str,
    store: &Mutex<BTreeMap<String, String>>,
    reject_sets: bool,
) -> (&'static str, String) {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let mut store = store.lock().expect("store mutex poisoned");
    match path {
        "/0/config/list" => (
            "200 OK",
            store
                .iter()
                .map(|(key, value)| format!("{key} = {value}\n"))
                .collect(),
        ),
        "/0/config/get" => {
            let key = query.strip_prefix("query=").unwrap_or_default();
            match store.get(key) {
                Some(value) => ("200 OK", format!("{key} = {value}\nDone\n")),
                None => ("200 OK", format!("Unknown option {key}\nDone\n")),
            }
        }
        "/0/config/set" if reject_sets => ("200 OK", "Done\n".to_owned()),
        "/0/config/set" => {
            let (key, value) = query.split_once('=').unwrap_or((query, ""));
            store.insert(key.to_owned(), value.to_owned());
            ("200 OK", format!("{key} = {value}\nDone\n"))
        }
        "/0/config/write" => ("200 OK", "Camera 0 write\nDone\n".to_owned()),
        _ => ("404 Not Found", String::new()),
    }
}

/// Supervisor events captured for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    ConfigLoaded,
    ConfigRejected(String),
    DaemonStarting,
    DaemonSpawned(u32),
    DaemonReady(u32),
    DetectionFailed(bool),
    StartupFailed(String),
    DaemonStopping(u32),
    DaemonStopped { pid: u32, forced: bool },
    ShutdownFailed(u32),
}

/// Records supervisor events for assertions.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<SupervisorEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<SupervisorEvent> {
        self.events.lock().expect("reporter mutex poisoned").clone()
    }

    fn record(&self, event: SupervisorEvent) {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .push(event);
    }
}

impl SupervisorReporter for RecordingReporter {
    fn config_loaded(&self, _config: &ValidatedConfig) {
        self.record(SupervisorEvent::ConfigLoaded);
    }

    fn config_rejected(&self, _path: &Path, error: &SupervisorError) {
        self.record(SupervisorEvent::ConfigRejected(error.to_string()));
    }

    fn daemon_starting(&self, _command: &DaemonCommand, _config_path: &Path) {
        self.record(SupervisorEvent::DaemonStarting);
    }

    fn daemon_spawned(&self, pid: u32) {
        self.record(SupervisorEvent::DaemonSpawned(pid));
    }

    fn daemon_ready(&self, pid: u32) {
        self.record(SupervisorEvent::DaemonReady(pid));
    }

    fn detection_failed(&self, enabled: bool, _error: &SupervisorError) {
        self.record(SupervisorEvent::DetectionFailed(enabled));
    }

    fn startup_failed(&self, error: &SupervisorError) {
        self.record(SupervisorEvent::StartupFailed(error.to_string()));
    }

    fn daemon_stopping(&self, pid: u32) {
        self.record(SupervisorEvent::DaemonStopping(pid));
    }

    fn daemon_stopped(&self, pid: u32, forced: bool) {
        self.record(SupervisorEvent::DaemonStopped { pid, forced });
    }

    fn shutdown_failed(&self, pid: u32, _error: &SupervisorError) {
        self.record(SupervisorEvent::ShutdownFailed(pid));
    }
}

//! Behavioural tests for the daemon lifecycle and webcontrol brokering.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use motion_conf::TypedValue;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::{self, SupervisorEvent, TestWorld};

type StepResult = Result<(), String>;

#[fixture]
fn world() -> RefCell<TestWorld> {
    support::world()
}

#[given("a supervisor for a compliant motion configuration")]
fn given_compliant_configuration(world: &RefCell<TestWorld>) {
    world.borrow().fixture.write_config();
}

#[given("a supervisor for a motion configuration without a webcontrol port")]
fn given_configuration_without_webcontrol(world: &RefCell<TestWorld>) {
    world.borrow().fixture.write_config_without_webcontrol();
}

#[given("a pid file naming an exited process")]
fn given_stale_pid_file(world: &RefCell<TestWorld>) {
    world.borrow().fixture.write_stale_pid();
}

#[when("the supervisor is initialised")]
fn when_initialised(world: &RefCell<TestWorld>) {
    world.borrow_mut().init(false);
}

#[when("the supervisor is initialised strictly")]
fn when_initialised_strictly(world: &RefCell<TestWorld>) {
    world.borrow_mut().init(true);
}

#[when("the daemon is started with detection enabled")]
fn when_started_with_detection(world: &RefCell<TestWorld>) {
    world.borrow_mut().startup(true);
}

#[when("the daemon is started with detection disabled")]
fn when_started_without_detection(world: &RefCell<TestWorld>) {
    world.borrow_mut().startup(false);
}

#[when("the daemon is stopped")]
fn when_stopped(world: &RefCell<TestWorld>) {
    let mut world = world.borrow_mut();
    let result = world.supervisor.shutdown();
    world.record(result);
}

#[when("the daemon is restarted")]
fn when_restarted(world: &RefCell<TestWorld>) {
    let mut world = world.borrow_mut();
    world.first_pid = world.supervisor.status().pid;
    let result = world.supervisor.restart();
    world.record(result);
}

#[when("the key \"{key}\" is read")]
fn when_key_read(world: &RefCell<TestWorld>, key: String) {
    let mut world = world.borrow_mut();
    let result = world.supervisor.config_get(&key);
    world.last_value = world.record(result);
}

#[when("the key \"{key}\" is set to \"{value}\"")]
fn when_key_set(world: &RefCell<TestWorld>, key: String, value: String) {
    let mut world = world.borrow_mut();
    let result = world.supervisor.config_set(&key, &value, false);
    world.last_value = world.record(result);
}

#[when("detection is enabled")]
fn when_detection_enabled(world: &RefCell<TestWorld>) {
    let mut world = world.borrow_mut();
    let result = world.supervisor.enable_motion_detection(true);
    world.record(result);
}

#[then("detection is reported {expected}")]
fn then_detection_reported(world: &RefCell<TestWorld>, expected: String) -> StepResult {
    let wanted = match expected.as_str() {
        "enabled" => true,
        "disabled" => false,
        other => return Err(format!("unknown detection state '{other}'")),
    };
    let mut world = world.borrow_mut();
    let result = world.supervisor.is_motion_detection_enabled();
    world.detection = world.record(result);
    match world.detection {
        Some(actual) if actual == wanted => Ok(()),
        actual => Err(format!(
            "expected detection {expected}, got {actual:?} (error: {:?})",
            world.last_error
        )),
    }
}

#[then("the daemon is started")]
fn then_daemon_started(world: &RefCell<TestWorld>) -> StepResult {
    let world = world.borrow();
    if let Some(error) = &world.last_error {
        return Err(format!("supervisor call failed: {error}"));
    }
    match world.supervisor.is_started() {
        Ok(true) => Ok(()),
        other => Err(format!("expected a running daemon, got {other:?}")),
    }
}

#[then("the daemon is not started")]
fn then_daemon_not_started(world: &RefCell<TestWorld>) -> StepResult {
    match world.borrow().supervisor.is_started() {
        Ok(false) => Ok(()),
        other => Err(format!("expected no running daemon, got {other:?}")),
    }
}

#[then("the supervisor state is \"{state}\"")]
fn then_state_is(world: &RefCell<TestWorld>, state: String) -> StepResult {
    let actual = world.borrow().supervisor.state().to_string();
    if actual == state {
        Ok(())
    } else {
        Err(format!("expected state {state}, got {actual}"))
    }
}

#[then("the last error is \"{kind}\"")]
fn then_last_error(world: &RefCell<TestWorld>, kind: String) -> StepResult {
    let world = world.borrow();
    match &world.last_error {
        Some(error) if error.kind().to_string() == kind => Ok(()),
        Some(error) => Err(format!(
            "expected {kind} error, got {} ({error})",
            error.kind()
        )),
        None => Err(format!("expected {kind} error, but the call succeeded")),
    }
}

#[then("no error was reported")]
fn then_no_error(world: &RefCell<TestWorld>) -> StepResult {
    match &world.borrow().last_error {
        None => Ok(()),
        Some(error) => Err(format!("unexpected error: {error}")),
    }
}

#[then("the reporter recorded the daemon becoming ready")]
fn then_reporter_ready(world: &RefCell<TestWorld>) -> StepResult {
    let world = world.borrow();
    let events = world.reporter.events();
    let pid = world.supervisor.status().pid;
    let ready = events
        .iter()
        .any(|event| matches!(event, SupervisorEvent::DaemonReady(recorded) if Some(*recorded) == pid));
    if ready {
        Ok(())
    } else {
        Err(format!("daemon ready event missing for {pid:?}: {events:?}"))
    }
}

#[then("the reporter recorded a graceful stop")]
fn then_reporter_graceful_stop(world: &RefCell<TestWorld>) -> StepResult {
    let events = world.borrow().reporter.events();
    let stopped = events
        .iter()
        .any(|event| matches!(event, SupervisorEvent::DaemonStopped { forced: false, .. }));
    if stopped {
        Ok(())
    } else {
        Err(format!("graceful stop event missing: {events:?}"))
    }
}

#[then("the reporter recorded a rejected configuration")]
fn then_reporter_rejected(world: &RefCell<TestWorld>) -> StepResult {
    let events = world.borrow().reporter.events();
    let rejected = events
        .iter()
        .any(|event| matches!(event, SupervisorEvent::ConfigRejected(message) if message.contains("webcontrol_port")));
    if rejected {
        Ok(())
    } else {
        Err(format!("configuration rejection missing: {events:?}"))
    }
}

#[then("webcontrol received \"{key}\" set to \"{value}\"")]
fn then_webcontrol_received(world: &RefCell<TestWorld>, key: String, value: String) -> StepResult {
    let world = world.borrow();
    let expected = format!("/0/config/set?{key}={value}");
    let requests = world.fixture.webcontrol.requests();
    if !requests.contains(&expected) {
        return Err(format!("request {expected} missing: {requests:?}"));
    }
    match world.fixture.webcontrol.value(&key) {
        Some(stored) if stored == value => Ok(()),
        stored => Err(format!("expected {key} = {value}, store has {stored:?}")),
    }
}

#[then("the daemon announced {count} camera")]
fn then_cameras_announced(world: &RefCell<TestWorld>, count: String) -> StepResult {
    let expected: u32 = count
        .parse()
        .map_err(|error| format!("invalid camera count '{count}': {error}"))?;
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let cameras = world.borrow().supervisor.status().cameras;
        if cameras == Some(expected) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(format!("expected {expected} cameras, got {cameras:?}"));
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[then("the daemon runs under a new pid")]
fn then_new_pid(world: &RefCell<TestWorld>) -> StepResult {
    let world = world.borrow();
    let current = world.supervisor.status().pid;
    match (world.first_pid, current) {
        (Some(first), Some(second)) if first != second => Ok(()),
        pids => Err(format!("expected two distinct pids, got {pids:?}")),
    }
}

#[then("the value read is the integer {value}")]
fn then_value_is_integer(world: &RefCell<TestWorld>, value: String) -> StepResult {
    let expected: i64 = value
        .parse()
        .map_err(|error| format!("invalid integer '{value}': {error}"))?;
    match &world.borrow().last_value {
        Some(TypedValue::Integer(actual)) if *actual == expected => Ok(()),
        other => Err(format!("expected integer {expected}, got {other:?}")),
    }
}

#[scenario(path = "tests/features/supervisor_lifecycle.feature")]
fn supervisor_lifecycle(world: RefCell<TestWorld>) -> Result<(), String> {
    let _ = world;
    Ok(())
}

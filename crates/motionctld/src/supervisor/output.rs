//! Forwards daemon output into the supervisor log.

use std::io::{BufRead, BufReader, Read};
use std::process::Child;
use std::sync::{Arc, OnceLock};
use std::thread;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use super::OUTPUT_TARGET;

static RUNNING_BANNER: Lazy<Regex> = Lazy::new(compile_banner);

#[expect(
    clippy::expect_used,
    reason = "pattern is a string literal covered by unit tests"
)]
fn compile_banner() -> Regex {
    Regex::new(r"Motion \S+ Running \[(\d+)\] Camera").expect("banner pattern must compile")
}

/// Extracts the camera count from the daemon's `Running` banner.
///
/// Matches output such as `Motion 4.1.1+gitfcc66b8 Running [1] Camera`.
#[must_use]
pub fn running_cameras(output: &str) -> Option<u32> {
    RUNNING_BANNER
        .captures(output)
        .and_then(|captures| captures.get(1))
        .and_then(|count| count.as_str().parse().ok())
}

/// Camera count announced by the daemon, shared with the forwarder threads.
pub(crate) type CameraCount = Arc<OnceLock<u32>>;

/// Takes the child's piped stdout and stderr and logs each line.
pub(crate) fn forward_output(child: &mut Child) -> CameraCount {
    let cameras = CameraCount::default();
    let pid = child.id();
    if let Some(stdout) = child.stdout.take() {
        spawn_forwarder(stdout, "stdout", pid, Arc::clone(&cameras));
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_forwarder(stderr, "stderr", pid, Arc::clone(&cameras));
    }
    cameras
}

fn spawn_forwarder<R>(stream: R, name: &'static str, pid: u32, cameras: CameraCount)
where
    R: Read + Send + 'static,
{
    let spawned = thread::Builder::new()
        .name(format!("motion-{name}"))
        .spawn(move || {
            for line in BufReader::new(stream).lines().map_while(Result::ok) {
                debug!(target: OUTPUT_TARGET, pid, stream = name, line = %line, "motion output");
                if let Some(count) = running_cameras(&line)
                    && cameras.set(count).is_ok()
                {
                    info!(target: OUTPUT_TARGET, pid, cameras = count, "motion reported running");
                }
            }
        });
    if let Err(error) = spawned {
        tracing::warn!(
            target: OUTPUT_TARGET,
            pid,
            stream = name,
            %error,
            "failed to start output forwarder"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::process::{Command, Stdio};
    use std::time::{Duration, Instant};

    #[rstest]
    #[case("Motion 4.1.1+gitfcc66b8 Running [1] Camera\n0\n", Some(1))]
    #[case("[0:motion] [NTC] [ALL] motion_startup: Motion 4.3.2 Running [3] Camera threads", Some(3))]
    #[case("Motion 4.3.2 Started", None)]
    #[case("Running [x] Camera", None)]
    fn recognises_running_banner(#[case] output: &str, #[case] expected: Option<u32>) {
        assert_eq!(running_cameras(output), expected);
    }

    #[test]
    fn forwarder_records_camera_count() {
        let mut child = Command::new("/bin/sh")
            .arg("-c")
            .arg("echo starting; echo 'Motion 4.3.2 Running [2] Camera' >&2")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn shell");
        let cameras = forward_output(&mut child);
        child.wait().expect("wait");

        let deadline = Instant::now() + Duration::from_secs(5);
        while cameras.get().is_none() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(cameras.get(), Some(&2));
    }
}

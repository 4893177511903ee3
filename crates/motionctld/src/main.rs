use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = match motionctl_config::Config::load() {
        Ok(config) => config,
        Err(error) => {
            let _ = writeln!(io::stderr(), "motionctld: {error}");
            return ExitCode::FAILURE;
        }
    };
    match motionctld::run_service(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: "motionctld::service", %error, "service exited with an error");
            let _ = writeln!(io::stderr(), "motionctld: {error}");
            ExitCode::FAILURE
        }
    }
}

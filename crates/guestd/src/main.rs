use std::process::ExitCode;
use std::sync::Arc;

use guest_exec::SudoCommandRunner;
use guestd::{StructuredHealthReporter, SystemConfigLoader, bootstrap_with};

fn main() -> ExitCode {
    let reporter = Arc::new(StructuredHealthReporter::new());
    let runner = Arc::new(SudoCommandRunner::new());
    match bootstrap_with(&SystemConfigLoader, reporter, runner) {
        Ok(_agent) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("guestd: {error}");
            ExitCode::FAILURE
        }
    }
}

//! Unit tests for the lifecycle state machine.

use std::time::Duration;

use camino::Utf8PathBuf;
use guest_config::Config;
use guest_exec::testing::ScriptedRunner;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::tests::support::{HealthEvent, RecordingHealthReporter, probe_reporting};

struct Harness {
    _dir: TempDir,
    runner: Arc<ScriptedRunner>,
    reporter: Arc<RecordingHealthReporter>,
    snapshot_path: Utf8PathBuf,
}

impl Harness {
    fn controller(&self, statuses: &[EngineStatus]) -> ServiceController {
        let tracker = StatusTracker::new(
            Box::new(probe_reporting(statuses)),
            self.reporter.clone(),
            self.snapshot_path.clone(),
            Duration::from_millis(1),
        );
        let runner: Arc<dyn CommandRunner> = self.runner.clone();
        ServiceController::new(
            runner,
            Db2Commands::from_config(&Config::default()),
            tracker,
            Duration::from_millis(50),
        )
    }

    fn engine_commands(&self) -> Vec<String> {
        self.runner
            .commands()
            .into_iter()
            .filter(|command| command.contains("db2iauto") || command.contains("db2st"))
            .collect()
    }
}

#[fixture]
fn harness() -> Harness {
    let dir = TempDir::new().expect("temp dir");
    let snapshot_path = Utf8PathBuf::from_path_buf(dir.path().join("guestd.status"))
        .expect("utf-8 temp path");
    Harness {
        _dir: dir,
        runner: Arc::new(ScriptedRunner::new()),
        reporter: Arc::new(RecordingHealthReporter::default()),
        snapshot_path,
    }
}

#[rstest]
fn start_enables_autostart_and_waits_for_running(harness: Harness) {
    let mut controller =
        harness.controller(&[EngineStatus::Shutdown, EngineStatus::Running]);

    controller.start(false).expect("start should succeed");

    assert_eq!(controller.status(), LifecycleState::Running);
    assert_eq!(
        harness.engine_commands(),
        vec![
            String::from("/opt/ibm/db2/V10.5/instance/db2iauto -on db2inst1"),
            String::from("db2start"),
        ]
    );
    assert_eq!(
        harness.reporter.states(),
        vec![LifecycleState::Starting, LifecycleState::Shutdown, LifecycleState::Running]
    );
}

#[rstest]
#[case("SQL1026N The database manager is already active.")]
#[case("unexpected failure")]
fn start_command_failures_are_not_fatal(harness: Harness, #[case] stderr: &str) {
    harness.runner.fail_with("db2start", 1, stderr);
    let mut controller = harness.controller(&[EngineStatus::Running]);

    controller.start(false).expect("probe decides the outcome");
    assert_eq!(controller.status(), LifecycleState::Running);
}

#[rstest]
fn start_times_out_and_closes_the_restart_bracket(harness: Harness) {
    let mut controller = harness.controller(&[EngineStatus::Shutdown]);
    controller.tracker.begin_restart();

    let error = controller.start(false).expect_err("start should time out");

    assert!(matches!(error, LifecycleError::StartTimedOut { .. }));
    assert!(!controller.tracker().is_restart_in_progress());
    assert!(
        harness
            .reporter
            .events()
            .contains(&HealthEvent::RestartFinished { succeeded: false })
    );
}

#[rstest]
fn autostart_failures_are_fatal(harness: Harness) {
    harness.runner.fail("db2iauto -on", 1);
    let mut controller = harness.controller(&[EngineStatus::Running]);

    let error = controller.start(false).expect_err("autostart failure is fatal");

    assert!(matches!(error, LifecycleError::Autostart { enable: true, .. }));
    assert!(harness.runner.commands_containing("db2start").is_empty());
    assert!(error.to_string().starts_with("failed to enable autostart"));
}

#[rstest]
fn stop_optionally_disables_autostart(harness: Harness) {
    let mut controller = harness.controller(&[EngineStatus::Shutdown]);

    controller.stop(false, true).expect("stop should succeed");
    controller.stop(false, false).expect("repeated stop succeeds");

    assert_eq!(harness.runner.commands_containing("db2iauto -off").len(), 1);
    assert_eq!(harness.runner.commands_containing("db2stop").len(), 2);
    assert_eq!(controller.status(), LifecycleState::Shutdown);
}

#[rstest]
fn stop_tolerates_an_already_stopped_engine(harness: Harness) {
    harness
        .runner
        .fail_with("db2stop", 1, "SQL1032N No start database manager command was issued.");
    let mut controller = harness.controller(&[EngineStatus::Shutdown]);

    controller.stop(false, false).expect("already stopped is fine");
}

#[rstest]
fn stop_times_out_when_the_engine_keeps_running(harness: Harness) {
    let mut controller = harness.controller(&[EngineStatus::Running]);

    let error = controller.stop(false, false).expect_err("stop should time out");
    assert!(matches!(error, LifecycleError::StopTimedOut { .. }));
}

#[rstest]
fn crashes_abort_the_wait(harness: Harness) {
    let mut controller = harness
        .controller(&[EngineStatus::Crashed])
        .with_state_change_wait(Duration::from_secs(60));

    let error = controller.start(false).expect_err("crash is fatal");

    assert!(matches!(
        error,
        LifecycleError::Crashed {
            expected: LifecycleState::Running
        }
    ));
}

#[rstest]
fn restart_brackets_stop_and_start(harness: Harness) {
    let mut controller = harness.controller(&[EngineStatus::Shutdown, EngineStatus::Running]);

    controller.restart().expect("restart should succeed");

    let events = harness.reporter.events();
    assert_eq!(events.first(), Some(&HealthEvent::RestartStarted));
    assert_eq!(
        events.last(),
        Some(&HealthEvent::RestartFinished { succeeded: true })
    );
    assert!(!controller.tracker().is_restart_in_progress());
    let order = harness.engine_commands();
    let stop = order.iter().position(|command| command.contains("db2stop"));
    let start = order.iter().position(|command| command == "db2start");
    assert!(stop < start, "stop must precede start: {order:?}");
}

#[rstest]
fn failed_restarts_still_close_the_bracket(harness: Harness) {
    let mut controller = harness.controller(&[EngineStatus::Running]);

    controller.restart().expect_err("stop never completes");

    assert!(!controller.tracker().is_restart_in_progress());
    let finished = harness
        .reporter
        .events()
        .into_iter()
        .filter(|event| matches!(event, HealthEvent::RestartFinished { .. }))
        .count();
    assert_eq!(finished, 1);
}

#[rstest]
fn host_commands_run_as_superuser(harness: Harness) {
    let controller = harness.controller(&[EngineStatus::Running]);

    controller.update_hostname().expect("hostname update");
    controller
        .change_ownership(Utf8Path::new("/home/db2inst1/db2inst1"))
        .expect("chown");

    let invocations = harness.runner.invocations();
    assert_eq!(invocations.len(), 2);
    assert!(invocations.iter().all(|call| call.principal == "root"));
}

#[rstest]
fn host_command_failures_name_the_action(harness: Harness) {
    harness.runner.fail("chown", 1);
    let controller = harness.controller(&[EngineStatus::Running]);

    let error = controller
        .change_ownership(Utf8Path::new("/srv/db2"))
        .expect_err("chown failure is fatal");

    assert!(matches!(
        error,
        LifecycleError::Host {
            action: "change ownership",
            ..
        }
    ));
}

//! Behavioural tests for the agent bootstrap sequence.
//!
//! Steps defined here are shared with the lifecycle and pagination suites.

use std::cell::RefCell;
use std::fs;

use guest_config::BackupStrategy;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::world::CAPTURE_COMMAND;
use super::support::{self, HealthEvent, TestWorld};

#[fixture]
fn world() -> RefCell<TestWorld> {
    support::world()
}

#[given("a healthy configuration loader")]
fn given_healthy_loader(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .use_successful_loader(BackupStrategy::Db2OfflineBackup);
}

#[given("a healthy configuration loader using online backups")]
fn given_online_backup_loader(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .use_successful_loader(BackupStrategy::Db2OnlineBackup);
}

#[given("a failing configuration loader")]
fn given_failing_loader(world: &RefCell<TestWorld>) {
    world.borrow_mut().use_failing_loader();
}

#[given("the engine prints its default configuration")]
fn given_default_configuration(world: &RefCell<TestWorld>) {
    world.borrow().script_default_configuration();
}

#[given("the engine refuses to print its configuration")]
fn given_capture_failure(world: &RefCell<TestWorld>) {
    world.borrow().runner.fail(CAPTURE_COMMAND, 4);
}

#[given("the agent bootstrap runs")]
fn given_bootstrap_ran(world: &RefCell<TestWorld>) {
    let mut world = world.borrow_mut();
    world.bootstrap();
    assert!(
        world.bootstrap_error().is_none(),
        "bootstrap error: {:?}",
        world.bootstrap_error()
    );
}

#[when("the agent bootstrap runs")]
fn when_bootstrap_runs(world: &RefCell<TestWorld>) {
    world.borrow_mut().bootstrap();
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<TestWorld>) {
    let mut world = world.borrow_mut();
    assert!(
        world.bootstrap_error().is_none(),
        "bootstrap error: {:?}",
        world.bootstrap_error()
    );
    let _ = world.agent();
}

#[then("bootstrap fails")]
fn then_bootstrap_fails(world: &RefCell<TestWorld>) {
    assert!(
        world.borrow().bootstrap_error().is_some(),
        "bootstrap succeeded unexpectedly"
    );
}

#[then("the default configuration was captured {count} time")]
fn then_capture_count(world: &RefCell<TestWorld>, count: usize) {
    let world = world.borrow();
    assert_eq!(world.runner.commands_containing(CAPTURE_COMMAND).len(), count);
    let stored = fs::read_to_string(world.mount_point().join(guest_config::DEFAULT_SNAPSHOT_FILE))
        .expect("default configuration should be stored");
    assert_eq!(stored, support::world::DEFAULT_CONFIGURATION);
}

#[then("the archive log directory was created for the instance owner")]
fn then_archive_directory_created(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let archive = world.mount_point().join("archived_logs");
    let invocations = world.runner.invocations();
    let created = invocations.iter().any(|call| {
        call.principal == "root"
            && call.command.starts_with(&format!("mkdir -p {archive}"))
            && call.command.contains("chown db2inst1:db2inst1")
    });
    assert!(created, "archive directory command missing: {invocations:?}");
}

#[then("the reporter recorded bootstrap start")]
fn then_reporter_start(world: &RefCell<TestWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapStarting),
        "bootstrap start event missing"
    );
}

#[then("the reporter recorded bootstrap success")]
fn then_reporter_success(world: &RefCell<TestWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapSucceeded),
        "bootstrap success event missing"
    );
}

#[then("the reporter recorded bootstrap failure")]
fn then_reporter_failure(world: &RefCell<TestWorld>) {
    let events = world.borrow().reporter.events();
    let failed = events
        .iter()
        .any(|event| matches!(event, HealthEvent::BootstrapFailed(_)));
    assert!(failed, "bootstrap failure event missing: {events:?}");
}

#[scenario(
    path = "tests/features/agent_bootstrap.feature",
    name = "Bootstrapping captures the default configuration"
)]
fn bootstrap_captures_defaults(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/agent_bootstrap.feature",
    name = "A stored default configuration is never captured again"
)]
fn bootstrap_reuses_stored_defaults(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/agent_bootstrap.feature",
    name = "Invalid configuration aborts bootstrap"
)]
fn bootstrap_rejects_invalid_configuration(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/agent_bootstrap.feature",
    name = "A failing capture aborts bootstrap"
)]
fn bootstrap_fails_without_defaults(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/agent_bootstrap.feature",
    name = "Online backups prepare the archive log directory"
)]
fn bootstrap_prepares_archive_directory(world: RefCell<TestWorld>) {
    drop(world);
}

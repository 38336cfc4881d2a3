//! BDD test world: loader, reporter, scripted runner, and the bootstrapped
//! agent shared by step functions.

use std::cell::RefCell;
use std::fs;
use std::sync::Arc;

use camino::Utf8PathBuf;
use guest_config::{BackupStrategy, STATUS_SNAPSHOT_FILE};
use guest_exec::testing::ScriptedRunner;

use crate::admin::Db2Admin;
use crate::bootstrap::{Agent, BootstrapError, ConfigLoader, bootstrap_with};
use crate::lifecycle::LifecycleError;
use crate::models::{DatabaseSchema, DatabaseUser};
use crate::overrides::OverrideError;
use crate::pagination::Page;
use crate::status::StatusSnapshot;

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::reporter::RecordingHealthReporter;

/// Needle matching the engine's "get configuration" command.
pub const CAPTURE_COMMAND: &str = "get dbm configuration";

/// Needle matching the engine status command.
pub const STATUS_COMMAND: &str = "db2sysc";

/// Needle matching the database listing command.
pub const DATABASE_LISTING: &str = "list database directory";

/// Factory configuration printed by the scripted engine.
pub const DEFAULT_CONFIGURATION: &str = "\
 Monitor heap size (4KB)          (MON_HEAP_SZ) = AUTOMATIC(90)
 Diagnostic error capture level     (DIAGLEVEL) = 3
 TCP/IP Service name                 (SVCENAME) = db2c_db2inst1
";

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    loader: Box<dyn ConfigLoader>,
    mount_point: Option<Utf8PathBuf>,
    pub reporter: Arc<RecordingHealthReporter>,
    pub runner: Arc<ScriptedRunner>,
    agent: Option<Agent>,
    bootstrap_error: Option<BootstrapError>,
    pub lifecycle_result: Option<Result<(), LifecycleError>>,
    pub override_result: Option<Result<(), OverrideError>>,
    pub database_page: Option<Page<DatabaseSchema>>,
    pub user_page: Option<Page<DatabaseUser>>,
}

impl TestWorld {
    /// Builds a world with a successful configuration loader.
    #[must_use]
    pub fn new() -> Self {
        let mut world = Self {
            loader: Box::new(FailingConfigLoader),
            mount_point: None,
            reporter: Arc::new(RecordingHealthReporter::default()),
            runner: Arc::new(ScriptedRunner::new()),
            agent: None,
            bootstrap_error: None,
            lifecycle_result: None,
            override_result: None,
            database_page: None,
            user_page: None,
        };
        world.use_successful_loader(BackupStrategy::default());
        world
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
        self.mount_point = None;
        self.reset_results();
    }

    /// Installs a loader rooted at a fresh temporary mount point.
    pub fn use_successful_loader(&mut self, backup_strategy: BackupStrategy) {
        let loader = TestConfigLoader::new().with_backup_strategy(backup_strategy);
        self.mount_point = Some(loader.mount_point());
        self.loader = Box::new(loader);
        self.reset_results();
    }

    /// Scripts the engine's factory configuration listing.
    pub fn script_default_configuration(&self) {
        self.runner
            .succeed_with(CAPTURE_COMMAND, DEFAULT_CONFIGURATION);
    }

    /// Scripts the number of engine processes the status probe observes.
    pub fn script_process_count(&self, count: usize) {
        self.runner
            .succeed_with(STATUS_COMMAND, &format!("{count}\n"));
    }

    /// Runs the bootstrap sequence, replacing any earlier outcome.
    pub fn bootstrap(&mut self) {
        self.reset_results();
        let runner = self.runner.clone();
        match bootstrap_with(&*self.loader, self.reporter.clone(), runner) {
            Ok(agent) => self.agent = Some(agent),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Returns the bootstrap error, if any.
    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Bootstrapped agent.
    ///
    /// # Panics
    ///
    /// Panics when bootstrap has not succeeded.
    pub fn agent(&mut self) -> &mut Agent {
        self.agent.as_mut().expect("agent should be bootstrapped")
    }

    /// Admin surface of the bootstrapped agent.
    pub fn admin(&mut self) -> &Db2Admin {
        self.agent().admin()
    }

    /// Temporary mount point of the active loader.
    #[must_use]
    pub fn mount_point(&self) -> Utf8PathBuf {
        self.mount_point
            .clone()
            .expect("successful loader should be installed")
    }

    /// Persisted status snapshot under the mount point.
    #[must_use]
    pub fn persisted_status(&self) -> StatusSnapshot {
        let raw = fs::read_to_string(self.mount_point().join(STATUS_SNAPSHOT_FILE))
            .expect("status snapshot should be written");
        serde_json::from_str(&raw).expect("status snapshot should be JSON")
    }

    fn reset_results(&mut self) {
        self.agent = None;
        self.bootstrap_error = None;
        self.lifecycle_result = None;
        self.override_result = None;
        self.database_page = None;
        self.user_page = None;
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}

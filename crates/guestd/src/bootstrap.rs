//! Agent bootstrap orchestration.

use std::sync::Arc;

use guest_config::Config;
use guest_exec::CommandRunner;
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use crate::admin::Db2Admin;
use crate::app::Db2App;
use crate::commands::Db2Commands;
use crate::health::HealthReporter;
use crate::lifecycle::{LifecycleError, ServiceController};
use crate::models::Db2SchemaPolicy;
use crate::overrides::OverrideController;
use crate::snapshot::{DefaultSnapshot, SnapshotError};
use crate::status::{Db2StatusProbe, StatusTracker};
use crate::store::FileConfigurationStore;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the agent configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The default configuration could not be captured or loaded.
    #[error("failed to load the default configuration: {source}")]
    Snapshot {
        /// Underlying snapshot error.
        #[source]
        source: SnapshotError,
    },
    /// Host preparation failed.
    #[error("failed to prepare the host: {source}")]
    Host {
        /// Underlying host command failure.
        #[source]
        source: LifecycleError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Agent {
    app: Db2App,
    admin: Db2Admin,
    telemetry: TelemetryHandle,
}

impl Agent {
    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        self.app.config()
    }

    /// Lifecycle and configuration facade.
    #[must_use]
    pub const fn app(&self) -> &Db2App {
        &self.app
    }

    /// Mutable access to the lifecycle and configuration facade.
    pub fn app_mut(&mut self) -> &mut Db2App {
        &mut self.app
    }

    /// Database and user administration.
    #[must_use]
    pub const fn admin(&self) -> &Db2Admin {
        &self.admin
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }
}

/// Bootstraps the agent using the supplied collaborators.
///
/// Loads configuration, installs telemetry, captures the default
/// configuration snapshot if none is stored yet, wires the controllers, and
/// prepares host directories required by the backup strategy.
///
/// # Errors
///
/// Returns the first [`BootstrapError`]; the reporter is told about it first.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    runner: Arc<dyn CommandRunner>,
) -> Result<Agent, BootstrapError> {
    reporter.bootstrap_starting();
    match assemble(loader, &reporter, runner) {
        Ok(agent) => {
            reporter.bootstrap_succeeded(agent.config());
            Ok(agent)
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn assemble(
    loader: &dyn ConfigLoader,
    reporter: &Arc<dyn HealthReporter>,
    runner: Arc<dyn CommandRunner>,
) -> Result<Agent, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    let commands = Db2Commands::from_config(&config);
    let defaults = DefaultSnapshot::load_or_capture(
        &config.default_snapshot_path(),
        runner.as_ref(),
        &commands.get_dbm_configuration(),
    )
    .map_err(|source| BootstrapError::Snapshot { source })?;

    let tracker = StatusTracker::new(
        Box::new(Db2StatusProbe::new(runner.clone(), commands.engine_status())),
        reporter.clone(),
        config.status_snapshot_path(),
        config.status_poll_interval(),
    );
    let lifecycle = ServiceController::new(
        runner.clone(),
        commands.clone(),
        tracker,
        config.state_change_wait_time(),
    );
    let overrides = OverrideController::new(
        runner.clone(),
        commands.clone(),
        Arc::new(FileConfigurationStore::from_config(&config)),
        defaults,
        reporter.clone(),
    );
    let admin = Db2Admin::new(
        runner,
        commands,
        Arc::new(Db2SchemaPolicy::new(config.ignored_users().to_vec())),
        config.backup_strategy(),
        config.ignored_users().to_vec(),
    );

    let app = Db2App::new(config, lifecycle, overrides);
    app.prepare_host()
        .map_err(|source| BootstrapError::Host { source })?;

    Ok(Agent {
        app,
        admin,
        telemetry,
    })
}

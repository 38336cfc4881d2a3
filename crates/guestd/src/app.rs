//! Engine-facing facade combining lifecycle and configuration control.

use camino::Utf8Path;
use guest_config::Config;
use tracing::{debug, info};

use crate::lifecycle::{LifecycleError, ServiceController};
use crate::overrides::{OverrideController, OverrideError};
use crate::status::LifecycleState;
use crate::store::OverrideLayer;

const APP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::app");

/// Lifecycle and configuration operations for one engine instance.
pub struct Db2App {
    config: Config,
    lifecycle: ServiceController,
    overrides: OverrideController,
}

impl Db2App {
    /// Assembles the facade from its controllers.
    #[must_use]
    pub fn new(config: Config, lifecycle: ServiceController, overrides: OverrideController) -> Self {
        Self {
            config,
            lifecycle,
            overrides,
        }
    }

    /// Configuration the controllers were built from.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Last known lifecycle state.
    #[must_use]
    pub const fn status(&self) -> LifecycleState {
        self.lifecycle.status()
    }

    /// Lifecycle controller.
    #[must_use]
    pub const fn lifecycle(&self) -> &ServiceController {
        &self.lifecycle
    }

    /// Override controller.
    #[must_use]
    pub const fn overrides(&self) -> &OverrideController {
        &self.overrides
    }

    /// Starts the engine. See [`ServiceController::start`].
    ///
    /// # Errors
    ///
    /// Propagates [`LifecycleError`].
    pub fn start(&mut self, update_persisted_state: bool) -> Result<(), LifecycleError> {
        self.lifecycle.start(update_persisted_state)
    }

    /// Stops the engine. See [`ServiceController::stop`].
    ///
    /// # Errors
    ///
    /// Propagates [`LifecycleError`].
    pub fn stop(
        &mut self,
        update_persisted_state: bool,
        disable_autostart: bool,
    ) -> Result<(), LifecycleError> {
        self.lifecycle.stop(update_persisted_state, disable_autostart)
    }

    /// Restarts the engine. See [`ServiceController::restart`].
    ///
    /// # Errors
    ///
    /// Propagates [`LifecycleError`].
    pub fn restart(&mut self) -> Result<(), LifecycleError> {
        self.lifecycle.restart()
    }

    /// Stores `raw` as the base configuration, then starts the engine so
    /// start-time parameters take effect.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] when the text cannot be stored, or
    /// any start failure.
    pub fn start_with_config_changes(&mut self, raw: &str) -> Result<(), LifecycleError> {
        self.overrides
            .save_configuration(raw)
            .map_err(|source| LifecycleError::Store { source })?;
        debug!(target: APP_TARGET, bytes = raw.len(), "configuration saved, starting engine");
        self.lifecycle.start(true)
    }

    /// Applies an override layer. See [`OverrideController::apply_overrides`].
    ///
    /// # Errors
    ///
    /// Propagates [`OverrideError`].
    pub fn apply_overrides(&self, overrides: &OverrideLayer) -> Result<(), OverrideError> {
        self.overrides.apply_overrides(overrides)
    }

    /// Applies non-empty override layers. See
    /// [`OverrideController::update_overrides`].
    ///
    /// # Errors
    ///
    /// Propagates [`OverrideError`].
    pub fn update_overrides(
        &self,
        overrides: &OverrideLayer,
        remove: bool,
    ) -> Result<(), OverrideError> {
        self.overrides.update_overrides(overrides, remove)
    }

    /// Reverts the active layer. See [`OverrideController::remove_overrides`].
    ///
    /// # Errors
    ///
    /// Propagates [`OverrideError`].
    pub fn remove_overrides(&self) -> Result<(), OverrideError> {
        self.overrides.remove_overrides()
    }

    /// Records the guest's hostname in the instance registry.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Host`] when the command fails.
    pub fn update_hostname(&self) -> Result<(), LifecycleError> {
        self.lifecycle.update_hostname()
    }

    /// Hands the data volume at `mount_point` to the instance owner.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Host`] when the command fails.
    pub fn change_ownership(&self, mount_point: &Utf8Path) -> Result<(), LifecycleError> {
        self.lifecycle.change_ownership(mount_point)
    }

    /// Creates host directories the configured backup strategy relies on.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Host`] when a directory cannot be created.
    pub fn prepare_host(&self) -> Result<(), LifecycleError> {
        if !self.config.backup_strategy().requires_archive_logging() {
            return Ok(());
        }
        let archive = self.config.archive_logs_dir();
        self.lifecycle.create_owned_directory(archive)?;
        info!(target: APP_TARGET, path = %archive, "archive log directory ready");
        Ok(())
    }
}

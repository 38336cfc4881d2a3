//! Start/stop/restart state machine for the engine instance.
//!
//! Start and stop commands are issued best-effort: the engine reports an error
//! when it is already in the requested state, so every command failure is
//! logged and the outcome is decided by polling the status probe until the
//! target status appears or the state-change deadline passes. Autostart
//! toggles are the exception; their failures mean boot integration is broken
//! and are fatal.

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8Path;
use guest_exec::{CommandError, CommandRunner, CommandSpec};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::commands::{ALREADY_STARTED_CODE, ALREADY_STOPPED_CODE, Db2Commands};
use crate::status::{EngineStatus, LifecycleState, StatusTracker, WaitError};

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Fatal lifecycle failures.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    /// Toggling boot-time autostart failed.
    #[error("failed to {} autostart: {source}", autostart_verb(.enable))]
    Autostart {
        /// `true` when enabling, `false` when disabling.
        enable: bool,
        /// Underlying command failure.
        #[source]
        source: CommandError,
    },
    /// The engine did not report running before the deadline.
    #[error("engine failed to start within {waited_secs}s")]
    StartTimedOut {
        /// Seconds spent waiting.
        waited_secs: u64,
    },
    /// The engine did not report shut down before the deadline.
    #[error("engine failed to stop within {waited_secs}s")]
    StopTimedOut {
        /// Seconds spent waiting.
        waited_secs: u64,
    },
    /// The engine crashed while a transition was awaited.
    #[error("engine crashed while waiting for it to become {expected}")]
    Crashed {
        /// State that was awaited.
        expected: LifecycleState,
    },
    /// Persisting configuration before a start failed.
    #[error("failed to persist configuration before start: {source}")]
    Store {
        /// Underlying store failure.
        #[source]
        source: crate::store::StoreError,
    },
    /// A host-level command failed.
    #[error("failed to {action}: {source}")]
    Host {
        /// Short description of the host action.
        action: &'static str,
        /// Underlying command failure.
        #[source]
        source: CommandError,
    },
}

fn autostart_verb(enable: &bool) -> &'static str {
    if *enable { "enable" } else { "disable" }
}

/// Drives the engine through its lifecycle.
///
/// Callers must not run two lifecycle operations against the same instance at
/// once; the controller holds no locks.
pub struct ServiceController {
    runner: Arc<dyn CommandRunner>,
    commands: Db2Commands,
    tracker: StatusTracker,
    state_change_wait: Duration,
}

impl ServiceController {
    /// Builds a controller waiting up to `state_change_wait` per transition.
    #[must_use]
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        commands: Db2Commands,
        tracker: StatusTracker,
        state_change_wait: Duration,
    ) -> Self {
        Self {
            runner,
            commands,
            tracker,
            state_change_wait,
        }
    }

    /// Overrides the transition deadline.
    #[must_use]
    pub const fn with_state_change_wait(mut self, state_change_wait: Duration) -> Self {
        self.state_change_wait = state_change_wait;
        self
    }

    /// Last known lifecycle state.
    #[must_use]
    pub const fn status(&self) -> LifecycleState {
        self.tracker.last_status()
    }

    /// Status tracker backing this controller.
    #[must_use]
    pub const fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    /// Registers the instance with the boot-time autostart service.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Autostart`] when the command fails.
    pub fn enable_autostart(&self) -> Result<(), LifecycleError> {
        self.toggle_autostart(true)
    }

    /// Removes the instance from the boot-time autostart service.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Autostart`] when the command fails.
    pub fn disable_autostart(&self) -> Result<(), LifecycleError> {
        self.toggle_autostart(false)
    }

    fn toggle_autostart(&self, enable: bool) -> Result<(), LifecycleError> {
        let spec = if enable {
            self.commands.enable_autostart()
        } else {
            self.commands.disable_autostart()
        };
        self.runner
            .run(&spec)
            .map_err(|source| LifecycleError::Autostart { enable, source })?;
        debug!(target: LIFECYCLE_TARGET, enable, "autostart updated");
        Ok(())
    }

    /// Enables autostart, starts the engine, and waits until it runs.
    ///
    /// Any open restart bracket is closed when the start fails.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Autostart`], [`LifecycleError::Crashed`], or
    /// [`LifecycleError::StartTimedOut`].
    pub fn start(&mut self, update_persisted_state: bool) -> Result<(), LifecycleError> {
        let result = self.start_engine(update_persisted_state);
        if result.is_err() {
            self.tracker.end_restart(false);
        }
        result
    }

    fn start_engine(&mut self, update_persisted_state: bool) -> Result<(), LifecycleError> {
        self.enable_autostart()?;
        self.tracker
            .set_state(LifecycleState::Starting, update_persisted_state);
        info!(target: LIFECYCLE_TARGET, "starting engine");
        self.run_tolerating(&self.commands.start_engine(), ALREADY_STARTED_CODE);

        self.tracker
            .wait_for_status(
                EngineStatus::Running,
                self.state_change_wait,
                update_persisted_state,
            )
            .map_err(|error| match error {
                WaitError::TimedOut { waited_secs } => {
                    LifecycleError::StartTimedOut { waited_secs }
                }
                WaitError::Crashed => LifecycleError::Crashed {
                    expected: LifecycleState::Running,
                },
            })?;
        info!(target: LIFECYCLE_TARGET, "engine running");
        Ok(())
    }

    /// Optionally disables autostart, stops the engine, and waits until it
    /// is shut down.
    ///
    /// Any open restart bracket is closed when the stop fails.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Autostart`], [`LifecycleError::Crashed`], or
    /// [`LifecycleError::StopTimedOut`].
    pub fn stop(
        &mut self,
        update_persisted_state: bool,
        disable_autostart: bool,
    ) -> Result<(), LifecycleError> {
        let result = self.stop_engine(update_persisted_state, disable_autostart);
        if result.is_err() {
            self.tracker.end_restart(false);
        }
        result
    }

    fn stop_engine(
        &mut self,
        update_persisted_state: bool,
        disable_autostart: bool,
    ) -> Result<(), LifecycleError> {
        if disable_autostart {
            self.disable_autostart()?;
        }
        self.tracker
            .set_state(LifecycleState::Stopping, update_persisted_state);
        info!(target: LIFECYCLE_TARGET, "stopping engine");
        self.run_tolerating(&self.commands.stop_engine(), ALREADY_STOPPED_CODE);

        self.tracker
            .wait_for_status(
                EngineStatus::Shutdown,
                self.state_change_wait,
                update_persisted_state,
            )
            .map_err(|error| match error {
                WaitError::TimedOut { waited_secs } => {
                    LifecycleError::StopTimedOut { waited_secs }
                }
                WaitError::Crashed => LifecycleError::Crashed {
                    expected: LifecycleState::Shutdown,
                },
            })?;
        info!(target: LIFECYCLE_TARGET, "engine shut down");
        Ok(())
    }

    /// Stops then starts the engine inside a restart bracket.
    ///
    /// The bracket is closed on every exit path.
    ///
    /// # Errors
    ///
    /// Propagates the first failure of [`Self::stop`] or [`Self::start`].
    pub fn restart(&mut self) -> Result<(), LifecycleError> {
        self.tracker.begin_restart();
        let result = self
            .stop(false, false)
            .and_then(|()| self.start(false));
        self.tracker.end_restart(result.is_ok());
        result
    }

    /// Records the guest's hostname in the instance registry.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Host`] when the command fails.
    pub fn update_hostname(&self) -> Result<(), LifecycleError> {
        self.run_host("update the instance hostname", &self.commands.update_hostname())
    }

    /// Hands `path` to the instance owner.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Host`] when the command fails.
    pub fn change_ownership(&self, path: &Utf8Path) -> Result<(), LifecycleError> {
        self.run_host("change ownership", &self.commands.change_ownership(path))
    }

    /// Creates `path` owned by the instance owner.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Host`] when the command fails.
    pub fn create_owned_directory(&self, path: &Utf8Path) -> Result<(), LifecycleError> {
        self.run_host(
            "create the archive log directory",
            &self.commands.create_owned_directory(path),
        )
    }

    fn run_host(&self, action: &'static str, spec: &CommandSpec) -> Result<(), LifecycleError> {
        self.runner
            .run(spec)
            .map_err(|source| LifecycleError::Host { action, source })?;
        debug!(target: LIFECYCLE_TARGET, action, "host command completed");
        Ok(())
    }

    fn run_tolerating(&self, spec: &CommandSpec, benign_code: &str) {
        match self.runner.run(spec) {
            Ok(_) => {}
            Err(error) if error.reports(benign_code) => {
                debug!(
                    target: LIFECYCLE_TARGET,
                    command = spec.display_command(),
                    code = benign_code,
                    "engine already in requested state"
                );
            }
            Err(error) => {
                warn!(
                    target: LIFECYCLE_TARGET,
                    command = spec.display_command(),
                    error = %error,
                    "lifecycle command failed, waiting on status probe"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests;

//! Configuration override layers on top of the captured defaults.
//!
//! Overrides are pushed to the engine one parameter at a time. Reverting a
//! layer sets each of its parameters back to the value recorded in the
//! [`DefaultSnapshot`] instead of using the engine's bulk reset, which would
//! also discard parameters set while the guest image was provisioned.

use std::sync::Arc;

use guest_exec::{CommandError, CommandRunner};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::commands::Db2Commands;
use crate::health::HealthReporter;
use crate::snapshot::DefaultSnapshot;
use crate::store::{ConfigurationStore, OverrideLayer, StoreError};

const OVERRIDES_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::overrides");

/// Fatal override failures.
#[derive(Debug, Clone, Error)]
pub enum OverrideError {
    /// A parameter name contains characters the engine cannot accept.
    #[error("invalid configuration parameter name '{parameter}'")]
    InvalidParameter {
        /// Offending name.
        parameter: String,
    },
    /// Setting an override value failed.
    #[error("failed to apply configuration parameter '{parameter}': {source}")]
    Apply {
        /// Parameter being set.
        parameter: String,
        /// Underlying command failure.
        #[source]
        source: CommandError,
    },
    /// An overridden parameter has no captured default to revert to.
    #[error("no default value captured for configuration parameter '{parameter}'")]
    MissingDefault {
        /// Parameter without a default.
        parameter: String,
    },
    /// Setting a parameter back to its default failed.
    #[error("failed to revert configuration parameter '{parameter}': {source}")]
    Revert {
        /// Parameter being reverted.
        parameter: String,
        /// Underlying command failure.
        #[source]
        source: CommandError,
    },
    /// The configuration store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Applies and reverts override layers.
pub struct OverrideController {
    runner: Arc<dyn CommandRunner>,
    commands: Db2Commands,
    store: Arc<dyn ConfigurationStore>,
    defaults: DefaultSnapshot,
    reporter: Arc<dyn HealthReporter>,
}

impl OverrideController {
    /// Builds a controller reverting against `defaults`.
    #[must_use]
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        commands: Db2Commands,
        store: Arc<dyn ConfigurationStore>,
        defaults: DefaultSnapshot,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            runner,
            commands,
            store,
            defaults,
            reporter,
        }
    }

    /// Captured defaults used for reverts.
    #[must_use]
    pub const fn defaults(&self) -> &DefaultSnapshot {
        &self.defaults
    }

    /// Pushes every override to the engine and records the layer.
    ///
    /// Every parameter is attempted even after a failure. Parameters that
    /// were set stay set, but the layer is only recorded when all of them
    /// succeed.
    ///
    /// # Errors
    ///
    /// Returns the first [`OverrideError::InvalidParameter`] or
    /// [`OverrideError::Apply`] encountered, or [`OverrideError::Store`] when
    /// recording the layer fails.
    pub fn apply_overrides(&self, overrides: &OverrideLayer) -> Result<(), OverrideError> {
        let mut first_failure = None;
        for (parameter, value) in overrides {
            if let Err(error) = self.apply_parameter(parameter, value) {
                warn!(
                    target: OVERRIDES_TARGET,
                    parameter = parameter.as_str(),
                    error = %error,
                    "failed to apply configuration parameter"
                );
                first_failure.get_or_insert(error);
            }
        }
        if let Some(error) = first_failure {
            return Err(error);
        }

        self.store.apply_override(overrides)?;
        info!(
            target: OVERRIDES_TARGET,
            parameters = overrides.len(),
            "configuration overrides applied"
        );
        self.reporter.overrides_applied(overrides.len());
        Ok(())
    }

    /// Applies `overrides` when non-empty.
    ///
    /// `remove` is accepted for callers that pass it and has no effect.
    ///
    /// # Errors
    ///
    /// See [`Self::apply_overrides`].
    pub fn update_overrides(
        &self,
        overrides: &OverrideLayer,
        remove: bool,
    ) -> Result<(), OverrideError> {
        if overrides.is_empty() {
            debug!(target: OVERRIDES_TARGET, remove, "no overrides to update");
            return Ok(());
        }
        self.apply_overrides(overrides)
    }

    /// Reverts the active layer to captured defaults and deletes its record.
    ///
    /// Every parameter must be a valid name with a captured default; nothing
    /// is sent to the engine otherwise. Reverts stop at the first failing parameter.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideError::InvalidParameter`],
    /// [`OverrideError::MissingDefault`], [`OverrideError::Revert`], or
    /// [`OverrideError::Store`].
    pub fn remove_overrides(&self) -> Result<(), OverrideError> {
        let layer = self.store.active_override()?;
        if layer.is_empty() {
            debug!(target: OVERRIDES_TARGET, "no active override layer");
            return Ok(());
        }

        let reverts = layer
            .keys()
            .map(|parameter| {
                // The layer comes back from disk and is checked like caller input.
                if !is_parameter_name(parameter) {
                    return Err(OverrideError::InvalidParameter {
                        parameter: parameter.clone(),
                    });
                }
                self.defaults
                    .get(parameter)
                    .map(|value| (parameter.as_str(), value))
                    .ok_or_else(|| OverrideError::MissingDefault {
                        parameter: parameter.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (parameter, value) in reverts {
            self.runner
                .run(&self.commands.update_dbm_configuration(parameter, value))
                .map_err(|source| OverrideError::Revert {
                    parameter: parameter.to_owned(),
                    source,
                })?;
        }

        self.store.remove_override()?;
        info!(
            target: OVERRIDES_TARGET,
            parameters = layer.len(),
            "configuration overrides reverted"
        );
        self.reporter.overrides_reverted(layer.len());
        Ok(())
    }

    /// Stores `raw` as the base configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the text cannot be written.
    pub fn save_configuration(&self, raw: &str) -> Result<(), StoreError> {
        self.store.save(raw)
    }

    fn apply_parameter(&self, parameter: &str, value: &str) -> Result<(), OverrideError> {
        if !is_parameter_name(parameter) {
            return Err(OverrideError::InvalidParameter {
                parameter: parameter.to_owned(),
            });
        }
        self.runner
            .run(&self.commands.update_dbm_configuration(parameter, value))
            .map_err(|source| OverrideError::Apply {
                parameter: parameter.to_owned(),
                source,
            })?;
        debug!(
            target: OVERRIDES_TARGET,
            parameter,
            value,
            "configuration parameter applied"
        );
        Ok(())
    }
}

fn is_parameter_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || character == '_')
}

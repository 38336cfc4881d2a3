//! Structured health reporting for agent and engine lifecycle events.

use std::sync::Arc;

use guest_config::Config;

use crate::bootstrap::BootstrapError;
use crate::status::LifecycleState;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked whenever the tracked lifecycle state changes.
    fn status_changed(&self, previous: LifecycleState, current: LifecycleState);

    /// Invoked when a restart bracket opens.
    fn restart_started(&self);

    /// Invoked when a restart bracket closes.
    fn restart_finished(&self, succeeded: bool);

    /// Invoked after an override layer was applied and recorded.
    fn overrides_applied(&self, parameters: usize);

    /// Invoked after the active override layer was reverted to defaults.
    fn overrides_reverted(&self, parameters: usize);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn status_changed(&self, previous: LifecycleState, current: LifecycleState) {
        (**self).status_changed(previous, current);
    }

    fn restart_started(&self) {
        (**self).restart_started();
    }

    fn restart_finished(&self, succeeded: bool) {
        (**self).restart_finished(succeeded);
    }

    fn overrides_applied(&self, parameters: usize) {
        (**self).overrides_applied(parameters);
    }

    fn overrides_reverted(&self, parameters: usize) {
        (**self).overrides_reverted(parameters);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting guest agent bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            mount_point = %config.mount_point(),
            instance_owner = config.instance_owner(),
            backup_strategy = %config.backup_strategy(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "guest agent bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "guest agent bootstrap failed"
        );
    }

    fn status_changed(&self, previous: LifecycleState, current: LifecycleState) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "status_changed",
            previous = %previous,
            current = %current,
            "engine status changed"
        );
    }

    fn restart_started(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "restart_started",
            "engine restart started"
        );
    }

    fn restart_finished(&self, succeeded: bool) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "restart_finished",
            succeeded,
            "engine restart finished"
        );
    }

    fn overrides_applied(&self, parameters: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "overrides_applied",
            parameters,
            "configuration overrides applied"
        );
    }

    fn overrides_reverted(&self, parameters: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "overrides_reverted",
            parameters,
            "configuration overrides reverted"
        );
    }
}

//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::sync::Mutex;

use guest_config::Config;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::status::LifecycleState;

/// Structured health events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// The tracked lifecycle state changed.
    StatusChanged {
        previous: LifecycleState,
        current: LifecycleState,
    },
    /// A restart bracket opened.
    RestartStarted,
    /// A restart bracket closed.
    RestartFinished { succeeded: bool },
    /// An override layer was applied.
    OverridesApplied(usize),
    /// The override layer was reverted.
    OverridesReverted(usize),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Lifecycle states reported, in order, excluding the initial one.
    #[must_use]
    pub fn states(&self) -> Vec<LifecycleState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HealthEvent::StatusChanged { current, .. } => Some(current),
                _ => None,
            })
            .collect()
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn status_changed(&self, previous: LifecycleState, current: LifecycleState) {
        self.record(HealthEvent::StatusChanged { previous, current });
    }

    fn restart_started(&self) {
        self.record(HealthEvent::RestartStarted);
    }

    fn restart_finished(&self, succeeded: bool) {
        self.record(HealthEvent::RestartFinished { succeeded });
    }

    fn overrides_applied(&self, parameters: usize) {
        self.record(HealthEvent::OverridesApplied(parameters));
    }

    fn overrides_reverted(&self, parameters: usize) {
        self.record(HealthEvent::OverridesReverted(parameters));
    }
}

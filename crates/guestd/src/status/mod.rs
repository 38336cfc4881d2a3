//! Engine status observation and tracking.
//!
//! A [`StatusProbe`] classifies the engine into [`EngineStatus`] on demand.
//! The [`StatusTracker`] remembers the last known [`LifecycleState`], brackets
//! restarts, reports transitions to the [`HealthReporter`], and optionally
//! persists a JSON status snapshot so the state survives agent restarts.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use guest_exec::{CommandRunner, CommandSpec};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::fs::atomic_write;
use crate::health::HealthReporter;

const STATUS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::status");

/// Status of the engine as observed by a [`StatusProbe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineStatus {
    /// Engine processes are up.
    Running,
    /// No engine process is running.
    Shutdown,
    /// The engine state could not be determined or the engine failed.
    Crashed,
}

/// Lifecycle state tracked for the instance, including transient states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// The engine is stopped.
    #[default]
    Shutdown,
    /// A start was issued and is awaiting confirmation.
    Starting,
    /// The engine is accepting work.
    Running,
    /// A stop was issued and is awaiting confirmation.
    Stopping,
    /// The engine was observed in a failed state.
    Crashed,
}

impl LifecycleState {
    /// Lower-case label used in logs and the status snapshot.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shutdown => "shutdown",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Crashed => "crashed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl From<EngineStatus> for LifecycleState {
    fn from(status: EngineStatus) -> Self {
        match status {
            EngineStatus::Running => Self::Running,
            EngineStatus::Shutdown => Self::Shutdown,
            EngineStatus::Crashed => Self::Crashed,
        }
    }
}

/// Classifies the current engine status.
pub trait StatusProbe: Send + Sync {
    /// Observes the engine once.
    fn probe(&self) -> EngineStatus;
}

/// Probe counting the engine's system controller processes.
///
/// A count of `0` means the engine is shut down and any other count that it is
/// running. A failing status command is reported as [`EngineStatus::Crashed`].
pub struct Db2StatusProbe {
    runner: Arc<dyn CommandRunner>,
    command: CommandSpec,
}

impl Db2StatusProbe {
    /// Builds a probe issuing `command` through `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, command: CommandSpec) -> Self {
        Self { runner, command }
    }
}

impl StatusProbe for Db2StatusProbe {
    fn probe(&self) -> EngineStatus {
        match self.runner.run(&self.command) {
            Ok(output) => match output.tokens().next() {
                Some("0") => EngineStatus::Shutdown,
                _ => EngineStatus::Running,
            },
            Err(error) => {
                warn!(
                    target: STATUS_TARGET,
                    error = %error,
                    "status command failed"
                );
                EngineStatus::Crashed
            }
        }
    }
}

/// Reasons [`StatusTracker::wait_for_status`] gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    /// The target status was not observed before the deadline.
    #[error("status did not change within {waited_secs}s")]
    TimedOut {
        /// Seconds spent waiting.
        waited_secs: u64,
    },
    /// The probe reported a crashed engine.
    #[error("engine reported as crashed")]
    Crashed,
}

/// Status snapshot persisted under the mount point.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatusSnapshot {
    /// Last known lifecycle state.
    pub status: LifecycleState,
    /// Whether a restart bracket was open when the snapshot was written.
    pub restart_in_progress: bool,
    /// Unix timestamp (seconds) of the observation.
    pub timestamp: i64,
}

/// Tracks the engine's lifecycle state across probe observations.
pub struct StatusTracker {
    probe: Box<dyn StatusProbe>,
    reporter: Arc<dyn HealthReporter>,
    snapshot_path: Utf8PathBuf,
    poll_interval: Duration,
    state: LifecycleState,
    restart_in_progress: bool,
}

impl StatusTracker {
    /// Builds a tracker starting from [`LifecycleState::Shutdown`].
    #[must_use]
    pub fn new(
        probe: Box<dyn StatusProbe>,
        reporter: Arc<dyn HealthReporter>,
        snapshot_path: impl Into<Utf8PathBuf>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            probe,
            reporter,
            snapshot_path: snapshot_path.into(),
            poll_interval,
            state: LifecycleState::default(),
            restart_in_progress: false,
        }
    }

    /// Last known lifecycle state.
    #[must_use]
    pub const fn last_status(&self) -> LifecycleState {
        self.state
    }

    /// Returns `true` while a restart bracket is open.
    #[must_use]
    pub const fn is_restart_in_progress(&self) -> bool {
        self.restart_in_progress
    }

    /// Location of the persisted status snapshot.
    #[must_use]
    pub fn snapshot_path(&self) -> &Utf8Path {
        &self.snapshot_path
    }

    /// Opens a restart bracket.
    pub fn begin_restart(&mut self) {
        if !self.restart_in_progress {
            self.restart_in_progress = true;
            self.reporter.restart_started();
        }
    }

    /// Closes the restart bracket, if one is open.
    pub fn end_restart(&mut self, succeeded: bool) {
        if self.restart_in_progress {
            self.restart_in_progress = false;
            self.reporter.restart_finished(succeeded);
        }
    }

    /// Records `state`, reporting and optionally persisting the change.
    pub fn set_state(&mut self, state: LifecycleState, update_persisted: bool) {
        let previous = self.state;
        self.state = state;
        if previous != state {
            debug!(
                target: STATUS_TARGET,
                previous = %previous,
                current = %state,
                "lifecycle state changed"
            );
            self.reporter.status_changed(previous, state);
        }
        if update_persisted {
            self.persist();
        }
    }

    /// Polls the probe until it reports `target` or `timeout` elapses.
    ///
    /// Every observation is recorded. A [`EngineStatus::Crashed`] observation
    /// ends the wait immediately unless it is the target.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Crashed`] when the engine is reported crashed and
    /// [`WaitError::TimedOut`] when the deadline passes first.
    pub fn wait_for_status(
        &mut self,
        target: EngineStatus,
        timeout: Duration,
        update_persisted: bool,
    ) -> Result<(), WaitError> {
        let started = Instant::now();
        // A deadline past the clock's range never expires.
        let deadline = started.checked_add(timeout);
        loop {
            let observed = self.probe.probe();
            self.set_state(observed.into(), update_persisted);
            if observed == target {
                return Ok(());
            }
            if observed == EngineStatus::Crashed {
                return Err(WaitError::Crashed);
            }

            let pause = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(WaitError::TimedOut {
                            waited_secs: started.elapsed().as_secs(),
                        });
                    }
                    self.poll_interval.min(remaining)
                }
                None => self.poll_interval,
            };
            thread::sleep(pause);
        }
    }

    fn persist(&self) {
        let snapshot = StatusSnapshot {
            status: self.state,
            restart_in_progress: self.restart_in_progress,
            timestamp: OffsetDateTime::now_utc().unix_timestamp(),
        };
        let result = serde_json::to_vec(&snapshot)
            .map_err(std::io::Error::other)
            .and_then(|encoded| atomic_write(&self.snapshot_path, &encoded));
        if let Err(error) = result {
            warn!(
                target: STATUS_TARGET,
                path = %self.snapshot_path,
                error = %error,
                "failed to persist status snapshot"
            );
        }
    }
}

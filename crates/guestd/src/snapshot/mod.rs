//! The engine's factory-default configuration.
//!
//! The engine's own "reset configuration" command resets every parameter,
//! including those set while the guest image was built (for example the
//! service name the instance listens on). Reverting an override therefore
//! means setting each touched parameter back to the value captured here,
//! parameter by parameter.
//!
//! The snapshot is captured exactly once per instance: the raw output of the
//! engine's "get configuration" command is stored verbatim under the mount
//! point, and every later initialisation parses the stored copy instead of
//! asking the engine again.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::sync::Arc;

use camino::Utf8Path;
use guest_exec::{CommandError, CommandRunner, CommandSpec};
use thiserror::Error;
use tracing::{debug, info};

use crate::fs::atomic_write;

const SNAPSHOT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::snapshot");

/// Value stored for parameters the engine reports without a value.
pub const NULL_VALUE: &str = "NULL";

/// Keyword marking parameters the engine tunes automatically.
pub const AUTOMATIC: &str = "AUTOMATIC";

/// Errors raised while capturing or loading the snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The engine refused to print its configuration.
    #[error("failed to capture the default configuration: {source}")]
    Capture {
        /// Underlying command failure.
        #[source]
        source: CommandError,
    },
    /// Reading or writing the stored snapshot failed.
    #[error("failed to access default configuration snapshot '{path}': {source}")]
    Io {
        /// Snapshot path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// Immutable mapping from parameter name to captured default value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultSnapshot {
    values: BTreeMap<String, String>,
}

impl DefaultSnapshot {
    /// Loads the stored snapshot, capturing it first if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Capture`] when the capture command fails and
    /// [`SnapshotError::Io`] when the stored copy cannot be read or written.
    pub fn load_or_capture(
        path: &Utf8Path,
        runner: &dyn CommandRunner,
        capture: &CommandSpec,
    ) -> Result<Self, SnapshotError> {
        let raw = if path.exists() {
            debug!(
                target: SNAPSHOT_TARGET,
                path = %path,
                "reusing stored default configuration"
            );
            fs::read_to_string(path).map_err(|source| io_error(path, source))?
        } else {
            info!(
                target: SNAPSHOT_TARGET,
                path = %path,
                "capturing default configuration"
            );
            let output = runner
                .run(capture)
                .map_err(|source| SnapshotError::Capture { source })?;
            atomic_write(path, output.stdout.as_bytes())
                .map_err(|source| io_error(path, source))?;
            output.stdout
        };

        let snapshot = Self::parse(&raw);
        debug!(
            target: SNAPSHOT_TARGET,
            parameters = snapshot.len(),
            "default configuration loaded"
        );
        Ok(snapshot)
    }

    /// Parses the engine's configuration listing.
    ///
    /// Lines look like `Description (PARAM) = value`; lines without an
    /// assignment or a parenthesised parameter name are skipped. A repeated
    /// parameter keeps its last value.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let values = raw.lines().filter_map(parse_line).collect();
        Self { values }
    }

    /// Captured default of `parameter`.
    #[must_use]
    pub fn get(&self, parameter: &str) -> Option<&str> {
        self.values.get(parameter).map(String::as_str)
    }

    /// Number of captured parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Captured parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (label, value) = match line.split_once(" = ") {
        Some(parts) => parts,
        None => (line.trim_end().strip_suffix(" =")?, ""),
    };

    let open = label.rfind('(')?;
    let close = label.rfind(')')?;
    let parameter = label.get(open + 1..close)?.trim();
    if parameter.is_empty() {
        return None;
    }

    Some((parameter.to_owned(), normalise_value(value.trim_end())))
}

/// Re-encodes `AUTOMATIC(<seed>)` as `<seed> AUTOMATIC`, the form the update
/// command accepts, and stores empty values as [`NULL_VALUE`].
fn normalise_value(value: &str) -> String {
    if value.is_empty() {
        return NULL_VALUE.to_owned();
    }
    if value.contains(AUTOMATIC) {
        let seed = value
            .rfind('(')
            .zip(value.rfind(')'))
            .and_then(|(open, close)| value.get(open + 1..close));
        if let Some(seed) = seed {
            return format!("{seed} {AUTOMATIC}");
        }
    }
    value.to_owned()
}

fn io_error(path: &Utf8Path, source: io::Error) -> SnapshotError {
    SnapshotError::Io {
        path: path.to_string(),
        source: Arc::new(source),
    }
}

//! Errors raised while running administrative commands.
//!
//! I/O errors are wrapped in `Arc` to keep the error cheap to clone and to
//! satisfy the `result_large_err` Clippy lint.

use std::sync::Arc;

use thiserror::Error;

/// Failure of a single administrative command.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// The command process could not be spawned.
    #[error("failed to spawn '{command}' as {principal}: {source}")]
    Spawn {
        /// Display form of the command.
        command: String,
        /// Principal the command was meant to run as.
        principal: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The command exited with a non-zero status.
    #[error("'{command}' exited with status {status}: {stderr}")]
    NonZeroExit {
        /// Display form of the command.
        command: String,
        /// Process exit status, `-1` when terminated by a signal.
        status: i32,
        /// Trimmed standard error output, or standard output when the
        /// command wrote nothing to standard error.
        stderr: String,
    },

    /// The command did not finish within its timeout.
    #[error("'{command}' timed out after {timeout_secs}s")]
    Timeout {
        /// Display form of the command.
        command: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },

    /// Communicating with the command process failed.
    #[error("I/O error while running '{command}': {source}")]
    Io {
        /// Display form of the command.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl CommandError {
    /// Display form of the command that failed.
    #[must_use]
    pub fn command(&self) -> &str {
        match self {
            Self::Spawn { command, .. }
            | Self::NonZeroExit { command, .. }
            | Self::Timeout { command, .. }
            | Self::Io { command, .. } => command,
        }
    }

    /// Returns `true` when the command ran to completion but reported failure.
    #[must_use]
    pub const fn is_non_zero_exit(&self) -> bool {
        matches!(self, Self::NonZeroExit { .. })
    }

    /// Returns `true` when the command failed and its error output contains
    /// `code`, such as an engine message identifier.
    #[must_use]
    pub fn reports(&self, code: &str) -> bool {
        match self {
            Self::NonZeroExit { stderr, .. } => stderr.contains(code),
            _ => false,
        }
    }

    /// Returns `true` when the command exceeded its timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

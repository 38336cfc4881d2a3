//! Log sink formats understood by the agent's telemetry layer.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output format of the agent's log sink.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event, for the host's log shipper.
    #[default]
    Json,
    /// Single-line human-readable output for interactive debugging.
    Compact,
}

impl LogFormat {
    /// Returns `true` when events should be emitted as JSON objects.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

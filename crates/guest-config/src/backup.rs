//! Backup strategy selection.
//!
//! Online backups rely on archive logging, so the strategy influences how new
//! databases are configured and which host directories must exist before the
//! engine accepts work.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Backup strategy configured for the deployment.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BackupStrategy {
    /// Full offline backups; databases keep circular logging.
    #[default]
    Db2OfflineBackup,
    /// Online backups; every database is switched to archive logging.
    Db2OnlineBackup,
}

impl BackupStrategy {
    /// Returns `true` when new databases must be configured for log archiving.
    #[must_use]
    pub const fn requires_archive_logging(self) -> bool {
        matches!(self, Self::Db2OnlineBackup)
    }
}

/// Errors encountered while parsing a [`BackupStrategy`] from text.
pub type BackupStrategyParseError = strum::ParseError;

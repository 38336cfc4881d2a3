//! Built-in defaults applied when no layer supplies a value.

use camino::Utf8PathBuf;

use crate::backup::BackupStrategy;
use crate::logging::LogFormat;

/// Default log filter expression used by the agent.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// OS account that owns the engine instance.
pub const DEFAULT_INSTANCE_OWNER: &str = "db2inst1";

/// OS account used for host-level commands such as account management.
pub const DEFAULT_SUPERUSER: &str = "root";

/// Engine installation prefix.
pub const DEFAULT_INSTALL_DIR: &str = "/opt/ibm/db2/V10.5";

/// Data volume mount point holding the agent's persisted state.
pub const DEFAULT_MOUNT_POINT: &str = "/home/db2inst1/db2inst1";

/// Directory receiving archived transaction logs for online backups.
pub const DEFAULT_ARCHIVE_LOGS_DIR: &str = "/home/db2inst1/db2inst1/archived_logs";

/// Seconds to wait for the engine to reach a requested state.
pub const DEFAULT_STATE_CHANGE_WAIT_SECS: u64 = 600;

/// Milliseconds between two status probes while waiting.
pub const DEFAULT_STATUS_POLL_MILLIS: u64 = 3_000;

/// Seconds an individual administrative command may run.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 1_200;

/// Default log filter expression used by the agent.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default backup strategy.
#[must_use]
pub fn default_backup_strategy() -> BackupStrategy {
    BackupStrategy::Db2OfflineBackup
}

/// Default engine instance owner.
#[must_use]
pub fn default_instance_owner() -> String {
    DEFAULT_INSTANCE_OWNER.to_owned()
}

/// Default superuser principal.
#[must_use]
pub fn default_superuser() -> String {
    DEFAULT_SUPERUSER.to_owned()
}

/// Default engine installation prefix.
#[must_use]
pub fn default_install_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_INSTALL_DIR)
}

/// Default data volume mount point.
#[must_use]
pub fn default_mount_point() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_MOUNT_POINT)
}

/// Default archive-log directory.
#[must_use]
pub fn default_archive_logs_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_ARCHIVE_LOGS_DIR)
}

/// Accounts hidden from user listings.
///
/// The instance owner holds every authority on every database, so it would
/// otherwise appear as a user of each one.
#[must_use]
pub fn default_ignored_users() -> Vec<String> {
    vec![DEFAULT_INSTANCE_OWNER.to_ascii_uppercase()]
}

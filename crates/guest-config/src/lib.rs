//! Shared configuration for the DB2 guest agent.
//!
//! [`Config`] is resolved once at start-up through `ortho_config`, layering
//! command-line flags over `GUEST_*` environment variables over an optional
//! TOML file over the built-in defaults in [`defaults`]. The resolved value is
//! cloned into every controller at construction and never mutated afterwards,
//! so all controllers observe the same timeouts, principals, and paths.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod backup;
pub mod defaults;
mod logging;

pub use backup::{BackupStrategy, BackupStrategyParseError};
pub use defaults::{
    default_backup_strategy, default_ignored_users, default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// File name of the captured factory configuration under the mount point.
pub const DEFAULT_SNAPSHOT_FILE: &str = "db2_default_dbm.cfg";

/// File name of the raw base configuration under the mount point.
pub const BASE_CONFIGURATION_FILE: &str = "db2.cfg.fake";

/// Directory holding override layers under the mount point.
pub const OVERRIDES_DIRECTORY: &str = "overrides";

/// File name of the persisted engine status under the mount point.
pub const STATUS_SNAPSHOT_FILE: &str = "guestd.status";

/// Agent configuration resolved from CLI, environment, file, and defaults.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "GUEST")]
pub struct Config {
    /// Tracing filter expression, e.g. `info` or `guestd=debug`.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format of the log sink.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Data volume mount point holding snapshots and override layers.
    #[ortho_config(default = defaults::default_mount_point())]
    pub mount_point: Utf8PathBuf,
    /// OS account owning the engine instance.
    #[ortho_config(default = defaults::default_instance_owner())]
    pub instance_owner: String,
    /// OS account used for host-level commands.
    #[ortho_config(default = defaults::default_superuser())]
    pub superuser: String,
    /// Engine installation prefix.
    #[ortho_config(default = defaults::default_install_dir())]
    pub install_dir: Utf8PathBuf,
    /// Directory receiving archived logs when online backups are enabled.
    #[ortho_config(default = defaults::default_archive_logs_dir())]
    pub archive_logs_dir: Utf8PathBuf,
    /// Backup strategy of the deployment.
    #[ortho_config(default = defaults::default_backup_strategy())]
    pub backup_strategy: BackupStrategy,
    /// Accounts excluded from user listings.
    #[ortho_config(default = defaults::default_ignored_users())]
    pub ignored_users: Vec<String>,
    /// Seconds to wait for a lifecycle transition.
    #[ortho_config(default = defaults::DEFAULT_STATE_CHANGE_WAIT_SECS)]
    pub state_change_wait_secs: u64,
    /// Milliseconds between status probes.
    #[ortho_config(default = defaults::DEFAULT_STATUS_POLL_MILLIS)]
    pub status_poll_millis: u64,
    /// Seconds an individual administrative command may run.
    #[ortho_config(default = defaults::DEFAULT_COMMAND_TIMEOUT_SECS)]
    pub command_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
            mount_point: defaults::default_mount_point(),
            instance_owner: defaults::default_instance_owner(),
            superuser: defaults::default_superuser(),
            install_dir: defaults::default_install_dir(),
            archive_logs_dir: defaults::default_archive_logs_dir(),
            backup_strategy: defaults::default_backup_strategy(),
            ignored_users: defaults::default_ignored_users(),
            state_change_wait_secs: defaults::DEFAULT_STATE_CHANGE_WAIT_SECS,
            status_poll_millis: defaults::DEFAULT_STATUS_POLL_MILLIS,
            command_timeout_secs: defaults::DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log sink format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Backup strategy of the deployment.
    #[must_use]
    pub const fn backup_strategy(&self) -> BackupStrategy {
        self.backup_strategy
    }

    /// OS account owning the engine instance.
    #[must_use]
    pub fn instance_owner(&self) -> &str {
        self.instance_owner.as_str()
    }

    /// OS account used for host-level commands.
    #[must_use]
    pub fn superuser(&self) -> &str {
        self.superuser.as_str()
    }

    /// Engine installation prefix.
    #[must_use]
    pub fn install_dir(&self) -> &Utf8Path {
        self.install_dir.as_path()
    }

    /// Data volume mount point.
    #[must_use]
    pub fn mount_point(&self) -> &Utf8Path {
        self.mount_point.as_path()
    }

    /// Archive-log directory.
    #[must_use]
    pub fn archive_logs_dir(&self) -> &Utf8Path {
        self.archive_logs_dir.as_path()
    }

    /// Accounts excluded from user listings.
    #[must_use]
    pub fn ignored_users(&self) -> &[String] {
        &self.ignored_users
    }

    /// Returns `true` when `name` must be hidden from user listings.
    #[must_use]
    pub fn is_ignored_user(&self, name: &str) -> bool {
        self.ignored_users
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(name))
    }

    /// Deadline for a lifecycle transition.
    #[must_use]
    pub const fn state_change_wait_time(&self) -> Duration {
        Duration::from_secs(self.state_change_wait_secs)
    }

    /// Interval between status probes.
    #[must_use]
    pub const fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_millis)
    }

    /// Per-command timeout handed to the command runner.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Location of the captured factory configuration.
    #[must_use]
    pub fn default_snapshot_path(&self) -> Utf8PathBuf {
        self.mount_point.join(DEFAULT_SNAPSHOT_FILE)
    }

    /// Location of the raw base configuration file.
    #[must_use]
    pub fn base_configuration_path(&self) -> Utf8PathBuf {
        self.mount_point.join(BASE_CONFIGURATION_FILE)
    }

    /// Directory holding override layers.
    #[must_use]
    pub fn overrides_dir(&self) -> Utf8PathBuf {
        self.mount_point.join(OVERRIDES_DIRECTORY)
    }

    /// Location of the persisted engine status.
    #[must_use]
    pub fn status_snapshot_path(&self) -> Utf8PathBuf {
        self.mount_point.join(STATUS_SNAPSHOT_FILE)
    }
}

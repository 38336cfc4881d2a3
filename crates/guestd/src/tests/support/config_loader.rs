//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use guest_config::{BackupStrategy, Config};
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Loader that points the mount point at a temporary directory.
pub struct TestConfigLoader {
    mount: TempDir,
    backup_strategy: BackupStrategy,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mount: TempDir::new().expect("failed to create temporary mount point"),
            backup_strategy: BackupStrategy::default(),
        }
    }

    /// Switches the loaded configuration to online backups.
    #[must_use]
    pub fn with_backup_strategy(mut self, backup_strategy: BackupStrategy) -> Self {
        self.backup_strategy = backup_strategy;
        self
    }

    pub fn mount_point(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.mount.path().to_path_buf())
            .expect("temporary mount point was not valid UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let mount_point = self.mount_point();
        Ok(Config {
            archive_logs_dir: mount_point.join("archived_logs"),
            mount_point,
            backup_strategy: self.backup_strategy,
            state_change_wait_secs: 1,
            status_poll_millis: 1,
            command_timeout_secs: 5,
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing an invalid CLI argument.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("guestd"),
            OsString::from("--backup-strategy"),
            OsString::from("tape"),
        ];
        Config::load_from_iter(args)
    }
}

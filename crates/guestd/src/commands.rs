//! Catalogue of the engine and host commands issued by the agent.
//!
//! Each builder returns a ready-to-run [`CommandSpec`] carrying the principal
//! and timeout the command needs. Engine commands run as the instance owner;
//! account and filesystem commands run as the configured superuser.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use guest_config::Config;
use guest_exec::CommandSpec;

/// Message code reported by `db2start` when the instance is already active.
pub const ALREADY_STARTED_CODE: &str = "SQL1026N";

/// Message code reported by `db2stop` when the instance is not running.
pub const ALREADY_STOPPED_CODE: &str = "SQL1032N";

/// Authorities granted to (and revoked from) database users.
const USER_AUTHORITIES: &str = "DBADM,CREATETAB,BINDADD,CONNECT,DATAACCESS";

/// Builds [`CommandSpec`]s for the configured instance.
#[derive(Debug, Clone)]
pub struct Db2Commands {
    owner: String,
    superuser: String,
    install_dir: Utf8PathBuf,
    archive_logs_dir: Utf8PathBuf,
    timeout: Duration,
}

impl Db2Commands {
    /// Derives the catalogue from the agent configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            owner: config.instance_owner().to_owned(),
            superuser: config.superuser().to_owned(),
            install_dir: config.install_dir().to_path_buf(),
            archive_logs_dir: config.archive_logs_dir().to_path_buf(),
            timeout: config.command_timeout(),
        }
    }

    fn as_owner(&self, command: String) -> CommandSpec {
        CommandSpec::new(command, self.owner.as_str(), self.timeout)
    }

    fn as_superuser(&self, command: String) -> CommandSpec {
        CommandSpec::new(command, self.superuser.as_str(), self.timeout)
    }

    /// Registers the instance with the boot-time autostart service.
    #[must_use]
    pub fn enable_autostart(&self) -> CommandSpec {
        self.as_owner(format!("{}/instance/db2iauto -on {}", self.install_dir, self.owner))
    }

    /// Removes the instance from the boot-time autostart service.
    #[must_use]
    pub fn disable_autostart(&self) -> CommandSpec {
        self.as_owner(format!("{}/instance/db2iauto -off {}", self.install_dir, self.owner))
    }

    /// Starts the database manager.
    #[must_use]
    pub fn start_engine(&self) -> CommandSpec {
        self.as_owner(String::from("db2start"))
    }

    /// Disconnects every application and stops the database manager.
    #[must_use]
    pub fn stop_engine(&self) -> CommandSpec {
        self.as_owner(String::from(
            "db2 force application all; db2 terminate; db2stop",
        ))
    }

    /// Counts the engine's system controller processes.
    #[must_use]
    pub fn engine_status(&self) -> CommandSpec {
        self.as_owner(format!(
            "ps -ef | grep {} | grep db2sysc | grep -v grep | wc -l",
            self.owner
        ))
    }

    /// Prints the full database manager configuration.
    #[must_use]
    pub fn get_dbm_configuration(&self) -> CommandSpec {
        self.as_owner(String::from("db2 get dbm configuration"))
    }

    /// Sets one database manager configuration parameter.
    ///
    /// `value` reaches the engine as a single quoted shell word; `parameter`
    /// must already be a plain identifier.
    #[must_use]
    pub fn update_dbm_configuration(&self, parameter: &str, value: &str) -> CommandSpec {
        self.as_owner(format!(
            "db2 update database manager configuration using {parameter} {}",
            shell_quote(value)
        ))
    }

    /// Creates a database.
    #[must_use]
    pub fn create_database(&self, name: &str) -> CommandSpec {
        self.as_owner(format!("db2 create database {name}"))
    }

    /// Drops a database.
    #[must_use]
    pub fn drop_database(&self, name: &str) -> CommandSpec {
        self.as_owner(format!("db2 drop database {name}"))
    }

    /// Prints the names of the local databases, one per line.
    #[must_use]
    pub fn list_databases(&self) -> CommandSpec {
        self.as_owner(String::from(
            "db2 list database directory | grep -B6 -i indirect | \
             grep 'Database name' | sed 's/.*= //'",
        ))
    }

    /// Prints `<grantee> <data access flag>` for every grantee of `database`.
    #[must_use]
    pub fn list_database_users(&self, database: &str) -> CommandSpec {
        self.as_owner(format!(
            "db2 +o connect to {database}; \
             db2 -x select grantee, dataaccessauth from sysibm.sysdbauth; \
             db2 connect reset"
        ))
    }

    /// Grants the standard user authorities on `database` to `login`.
    #[must_use]
    pub fn grant_access(&self, database: &str, login: &str) -> CommandSpec {
        self.as_owner(format!(
            "db2 connect to {database}; \
             db2 GRANT {USER_AUTHORITIES} ON DATABASE TO USER {login}; \
             db2 connect reset"
        ))
    }

    /// Revokes the standard user authorities on `database` from `login`.
    #[must_use]
    pub fn revoke_access(&self, database: &str, login: &str) -> CommandSpec {
        self.as_owner(format!(
            "db2 connect to {database}; \
             db2 REVOKE {USER_AUTHORITIES} ON DATABASE FROM USER {login}; \
             db2 connect reset"
        ))
    }

    /// Switches `database` to archive logging into the archive directory.
    #[must_use]
    pub fn configure_log_archiving(&self, database: &str) -> CommandSpec {
        self.as_owner(format!(
            "db2 update database configuration for {database} using LOGARCHMETH1 'DISK:{}'",
            self.archive_logs_dir
        ))
    }

    /// Takes the offline backup that clears the backup-pending state.
    #[must_use]
    pub fn recover_from_backup_pending(&self, database: &str) -> CommandSpec {
        self.as_owner(format!("db2 backup database {database} to /dev/null"))
    }

    /// Creates an OS account with a home directory and sets its password.
    #[must_use]
    pub fn create_os_user(&self, login: &str, password: &str) -> CommandSpec {
        let credentials = shell_quote(&format!("{login}:{password}"));
        self.as_superuser(format!(
            "useradd -m -d /home/{login} {login}; echo {credentials} | chpasswd"
        ))
        .sensitive()
    }

    /// Deletes an OS account and its home directory.
    #[must_use]
    pub fn delete_os_user(&self, login: &str) -> CommandSpec {
        self.as_superuser(format!("userdel -r {}", login.to_lowercase()))
    }

    /// Records the guest's hostname in the instance registry.
    #[must_use]
    pub fn update_hostname(&self) -> CommandSpec {
        self.as_superuser(format!(
            "source /home/{}/sqllib/db2profile; db2set -g DB2SYSTEM=\"$(hostname)\"",
            self.owner
        ))
    }

    /// Hands `path` to the instance owner.
    #[must_use]
    pub fn change_ownership(&self, path: &Utf8Path) -> CommandSpec {
        self.as_superuser(format!("chown {owner}:{owner} {path}", owner = self.owner))
    }

    /// Creates `path` (and parents) owned by the instance owner.
    #[must_use]
    pub fn create_owned_directory(&self, path: &Utf8Path) -> CommandSpec {
        self.as_superuser(format!(
            "mkdir -p {path} && chown {owner}:{owner} {path}",
            owner = self.owner
        ))
    }
}

/// Wraps `value` in single quotes for `sh`, escaping embedded quotes.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

//! Database and user administration over the running engine.
//!
//! Users are not stored anywhere by the engine as such: a logical user is the
//! union of the database-local grants sharing one name. Every call that needs
//! users rebuilds that view by listing each database's grantees, since grants
//! can change between calls.
//!
//! Batch operations carry on past per-item command failures and report what
//! failed; single-target deletions fail fast. Validation failures always
//! abort before any command for the offending item is issued.

mod users;

use std::collections::BTreeSet;
use std::sync::Arc;

use guest_config::BackupStrategy;
use guest_exec::{CommandError, CommandOutput, CommandRunner, CommandSpec};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::commands::Db2Commands;
use crate::models::{DatabaseSchema, DatabaseUser, SchemaPolicy, ValidationError};
use crate::pagination::{Page, paginate};

use self::users::{UserIndex, grantees_with_access};

const ADMIN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::admin");

/// Fatal administration failures.
#[derive(Debug, Clone, Error)]
pub enum AdminError {
    /// A descriptor was rejected before any command ran.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Dropping a database failed.
    #[error("unable to delete database '{name}': {source}")]
    DeleteDatabase {
        /// Database name.
        name: String,
        /// Underlying command failure.
        #[source]
        source: CommandError,
    },
    /// Deleting a user's OS account failed.
    #[error("unable to delete user '{name}': {source}")]
    DeleteUser {
        /// User name.
        name: String,
        /// Underlying command failure.
        #[source]
        source: CommandError,
    },
}

/// Outcome of a batch operation that continues past per-item failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Names of the items whose command failed.
    pub failed: Vec<String>,
}

impl BatchReport {
    /// Returns `true` when every item succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Administrative operations on databases and users.
pub struct Db2Admin {
    runner: Arc<dyn CommandRunner>,
    commands: Db2Commands,
    policy: Arc<dyn SchemaPolicy>,
    backup_strategy: BackupStrategy,
    ignored_users: Vec<String>,
}

impl Db2Admin {
    /// Builds the admin surface.
    #[must_use]
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        commands: Db2Commands,
        policy: Arc<dyn SchemaPolicy>,
        backup_strategy: BackupStrategy,
        ignored_users: Vec<String>,
    ) -> Self {
        Self {
            runner,
            commands,
            policy,
            backup_strategy,
            ignored_users,
        }
    }

    /// Creates each database, continuing past command failures.
    ///
    /// With online backups, each created database is also switched to archive
    /// logging and taken out of backup-pending state, best-effort.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Validation`] for the first invalid descriptor.
    pub fn create_database(&self, databases: &[DatabaseSchema]) -> Result<BatchReport, AdminError> {
        let mut report = BatchReport::default();
        for database in databases {
            self.policy.check_database_create(database)?;
            let name = database.name.as_str();
            debug!(target: ADMIN_TARGET, database = name, "creating database");
            if let Err(error) = self.runner.run(&self.commands.create_database(name)) {
                warn!(
                    target: ADMIN_TARGET,
                    database = name,
                    error = %error,
                    "failed to create database"
                );
                report.failed.push(name.to_owned());
                continue;
            }
            if self.backup_strategy.requires_archive_logging() {
                self.best_effort(&self.commands.configure_log_archiving(name), name);
                self.best_effort(&self.commands.recover_from_backup_pending(name), name);
            }
        }

        if !report.is_complete() {
            warn!(
                target: ADMIN_TARGET,
                failed = ?report.failed,
                "creating some databases failed"
            );
        }
        Ok(report)
    }

    /// Drops one database.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Validation`] or [`AdminError::DeleteDatabase`].
    pub fn delete_database(&self, database: &DatabaseSchema) -> Result<(), AdminError> {
        self.policy.check_database_delete(database)?;
        let name = database.name.as_str();
        self.runner
            .run(&self.commands.drop_database(name))
            .map_err(|source| AdminError::DeleteDatabase {
                name: name.to_owned(),
                source,
            })?;
        info!(target: ADMIN_TARGET, database = name, "database deleted");
        Ok(())
    }

    /// Lists databases after `marker`, at most `limit` of them.
    ///
    /// A failing listing command yields an empty page.
    #[must_use]
    pub fn list_databases(&self, limit: Option<usize>, marker: Option<&str>) -> Page<DatabaseSchema> {
        let databases = self.database_names().into_iter().map(DatabaseSchema::new);
        paginate(databases, limit, marker, |database| database.name.as_str())
    }

    /// Creates each user's OS account and grants it its databases.
    ///
    /// A user whose account cannot be created gets no grants and is reported
    /// as failed. Grant failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Validation`] for the first invalid descriptor.
    pub fn create_user(&self, users: &[DatabaseUser]) -> Result<BatchReport, AdminError> {
        let mut report = BatchReport::default();
        for user in users {
            self.policy.check_user_create(user)?;
            let name = user.name.as_str();
            let password = user.password.as_deref().unwrap_or_default();
            debug!(target: ADMIN_TARGET, user = name, "creating OS user");
            if let Err(error) = self.runner.run(&self.commands.create_os_user(name, password)) {
                warn!(
                    target: ADMIN_TARGET,
                    user = name,
                    error = %error,
                    "failed to create user"
                );
                report.failed.push(name.to_owned());
                continue;
            }
            for database in &user.databases {
                self.best_effort(&self.commands.grant_access(database, name), database);
            }
        }
        Ok(report)
    }

    /// Revokes a user's database access and deletes the OS account.
    ///
    /// Without explicit databases the user's current grants are looked up.
    /// Revokes are best-effort; the account deletion is not.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Validation`] or [`AdminError::DeleteUser`].
    pub fn delete_user(&self, user: &DatabaseUser) -> Result<(), AdminError> {
        self.policy.check_user_delete(user)?;
        let name = user.name.as_str();
        let databases = if user.databases.is_empty() {
            self.list_access(name)
        } else {
            user.databases.clone()
        };
        debug!(target: ADMIN_TARGET, user = name, ?databases, "deleting user");

        for database in &databases {
            self.best_effort(&self.commands.revoke_access(database, name), database);
        }
        self.runner
            .run(&self.commands.delete_os_user(name))
            .map_err(|source| AdminError::DeleteUser {
                name: name.to_owned(),
                source,
            })?;
        info!(target: ADMIN_TARGET, user = name, "user deleted");
        Ok(())
    }

    /// Lists users after `marker`, at most `limit` of them.
    ///
    /// Each user appears once with every database it can access. Ignored
    /// accounts are left out.
    #[must_use]
    pub fn list_users(&self, limit: Option<usize>, marker: Option<&str>) -> Page<DatabaseUser> {
        let mut index = UserIndex::default();
        for database in self.database_names() {
            let Some(output) = self.database_grants(&database) else {
                continue;
            };
            for grantee in grantees_with_access(&output) {
                if !self.is_ignored(grantee) {
                    index.record(grantee, &database);
                }
            }
        }
        paginate(index.into_users(), limit, marker, |user| user.name.as_str())
    }

    /// Looks up one user by name, ignoring case.
    ///
    /// The user carries the grantee name as the engine spells it in the
    /// first database granting access. Returns `None` when the name holds
    /// access to no database.
    #[must_use]
    pub fn get_user(&self, name: &str) -> Option<DatabaseUser> {
        let mut found: Option<DatabaseUser> = None;
        for database in self.database_names() {
            let Some(output) = self.database_grants(&database) else {
                continue;
            };
            let Some(grantee) =
                grantees_with_access(&output).find(|grantee| grantee.eq_ignore_ascii_case(name))
            else {
                continue;
            };
            found
                .get_or_insert_with(|| DatabaseUser::new(grantee))
                .add_database(database);
        }
        found
    }

    /// Databases `name` can access, matched case-insensitively.
    #[must_use]
    pub fn list_access(&self, name: &str) -> BTreeSet<String> {
        self.get_user(name)
            .map(|user| user.databases)
            .unwrap_or_default()
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.ignored_users
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(name))
    }

    fn database_names(&self) -> Vec<String> {
        match self.runner.run(&self.commands.list_databases()) {
            Ok(output) => output.tokens().map(str::to_owned).collect(),
            Err(error) => {
                warn!(
                    target: ADMIN_TARGET,
                    error = %error,
                    "failed to list databases"
                );
                Vec::new()
            }
        }
    }

    fn database_grants(&self, database: &str) -> Option<CommandOutput> {
        match self.runner.run(&self.commands.list_database_users(database)) {
            Ok(output) => Some(output),
            Err(error) => {
                debug!(
                    target: ADMIN_TARGET,
                    database,
                    error = %error,
                    "failed to list database users"
                );
                None
            }
        }
    }

    fn best_effort(&self, spec: &CommandSpec, database: &str) {
        if let Err(error) = self.runner.run(spec) {
            warn!(
                target: ADMIN_TARGET,
                database,
                command = spec.display_command(),
                error = %error,
                "best-effort command failed"
            );
        }
    }
}

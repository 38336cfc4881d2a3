//! Database and user descriptors exchanged with the admin surface.
//!
//! Descriptors arrive serialised from the remote caller and are validated by a
//! [`SchemaPolicy`] before any command naming them is issued.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest database name the engine accepts.
pub const MAX_DATABASE_NAME_LEN: usize = 8;

/// Longest OS account name accepted for database users.
pub const MAX_USER_NAME_LEN: usize = 30;

/// A database, identified by its name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct DatabaseSchema {
    /// Database name.
    pub name: String,
}

impl DatabaseSchema {
    /// Builds a descriptor for `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A logical database user: one OS account granted access to many databases.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatabaseUser {
    /// Account name.
    pub name: String,
    /// Password, only present on create requests.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Names of the databases the user can access.
    #[serde(default)]
    pub databases: BTreeSet<String>,
}

impl DatabaseUser {
    /// Builds a user without password or databases.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: None,
            databases: BTreeSet::new(),
        }
    }

    /// Sets the password used when creating the account.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Adds `database` to the databases the user can access.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.add_database(database);
        self
    }

    /// Records access to `database`; repeated names are kept once.
    pub fn add_database(&mut self, database: impl Into<String>) {
        self.databases.insert(database.into());
    }
}

impl fmt::Debug for DatabaseUser {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DatabaseUser")
            .field("name", &self.name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("databases", &self.databases)
            .finish()
    }
}

/// Reasons a descriptor is rejected before any command runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The name is empty.
    #[error("{kind} name must not be empty")]
    EmptyName {
        /// `database` or `user`.
        kind: &'static str,
    },
    /// The name exceeds the engine's limit.
    #[error("{kind} name '{name}' exceeds {max} characters")]
    NameTooLong {
        /// `database` or `user`.
        kind: &'static str,
        /// Offending name.
        name: String,
        /// Maximum length.
        max: usize,
    },
    /// The name contains a character the engine rejects.
    #[error("{kind} name '{name}' contains invalid character '{character}'")]
    InvalidCharacter {
        /// `database` or `user`.
        kind: &'static str,
        /// Offending name.
        name: String,
        /// First rejected character.
        character: char,
    },
    /// The name must start with a letter.
    #[error("{kind} name '{name}' must start with a letter")]
    InvalidLeadingCharacter {
        /// `database` or `user`.
        kind: &'static str,
        /// Offending name.
        name: String,
    },
    /// The name is reserved for the agent or the engine.
    #[error("{kind} name '{name}' is reserved")]
    Reserved {
        /// `database` or `user`.
        kind: &'static str,
        /// Offending name.
        name: String,
    },
    /// A user was submitted for creation without a password.
    #[error("user '{name}' requires a password")]
    MissingPassword {
        /// User name.
        name: String,
    },
}

/// Decides whether descriptors may be created or deleted.
pub trait SchemaPolicy: Send + Sync {
    /// Validates a database about to be created.
    fn check_database_create(&self, database: &DatabaseSchema) -> Result<(), ValidationError>;

    /// Validates a database about to be dropped.
    fn check_database_delete(&self, database: &DatabaseSchema) -> Result<(), ValidationError>;

    /// Validates a user about to be created.
    fn check_user_create(&self, user: &DatabaseUser) -> Result<(), ValidationError>;

    /// Validates a user about to be deleted.
    fn check_user_delete(&self, user: &DatabaseUser) -> Result<(), ValidationError>;
}

/// Naming rules of the engine plus the agent's reserved accounts.
#[derive(Debug, Clone, Default)]
pub struct Db2SchemaPolicy {
    reserved_users: Vec<String>,
}

impl Db2SchemaPolicy {
    /// Builds a policy that refuses to touch `reserved_users`.
    #[must_use]
    pub fn new(reserved_users: impl IntoIterator<Item = String>) -> Self {
        Self {
            reserved_users: reserved_users.into_iter().collect(),
        }
    }

    fn check_user_name(&self, name: &str) -> Result<(), ValidationError> {
        check_name("user", name, MAX_USER_NAME_LEN, |c| {
            c.is_ascii_alphanumeric() || c == '_'
        })?;
        if self
            .reserved_users
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(name))
        {
            return Err(ValidationError::Reserved {
                kind: "user",
                name: name.to_owned(),
            });
        }
        Ok(())
    }
}

fn check_database_name(name: &str) -> Result<(), ValidationError> {
    check_name("database", name, MAX_DATABASE_NAME_LEN, |c| {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '#' | '$')
    })
}

fn check_name(
    kind: &'static str,
    name: &str,
    max: usize,
    allowed: impl Fn(char) -> bool,
) -> Result<(), ValidationError> {
    let Some(first) = name.chars().next() else {
        return Err(ValidationError::EmptyName { kind });
    };
    if name.chars().count() > max {
        return Err(ValidationError::NameTooLong {
            kind,
            name: name.to_owned(),
            max,
        });
    }
    if let Some(character) = name.chars().find(|c| !allowed(*c)) {
        return Err(ValidationError::InvalidCharacter {
            kind,
            name: name.to_owned(),
            character,
        });
    }
    if !first.is_ascii_alphabetic() {
        return Err(ValidationError::InvalidLeadingCharacter {
            kind,
            name: name.to_owned(),
        });
    }
    Ok(())
}

impl SchemaPolicy for Db2SchemaPolicy {
    fn check_database_create(&self, database: &DatabaseSchema) -> Result<(), ValidationError> {
        check_database_name(&database.name)
    }

    fn check_database_delete(&self, database: &DatabaseSchema) -> Result<(), ValidationError> {
        check_database_name(&database.name)
    }

    fn check_user_create(&self, user: &DatabaseUser) -> Result<(), ValidationError> {
        self.check_user_name(&user.name)?;
        if user.password.as_deref().is_none_or(str::is_empty) {
            return Err(ValidationError::MissingPassword {
                name: user.name.clone(),
            });
        }
        for database in &user.databases {
            check_database_name(database)?;
        }
        Ok(())
    }

    fn check_user_delete(&self, user: &DatabaseUser) -> Result<(), ValidationError> {
        self.check_user_name(&user.name)?;
        for database in &user.databases {
            check_database_name(database)?;
        }
        Ok(())
    }
}

//! Per-call index merging database-local grants into logical users.

use std::collections::HashMap;

use guest_exec::CommandOutput;

use crate::models::DatabaseUser;

/// Data access flag marking grantees that can use a database.
pub(super) const ACCESS_GRANTED: &str = "Y";

/// Grantees of one database that hold the access flag, in listing order.
///
/// Each line reads `<grantee> <flag> ...`; blank and short lines are skipped.
pub(super) fn grantees_with_access(output: &CommandOutput) -> impl Iterator<Item = &str> {
    output.lines().filter_map(|line| {
        let mut fields = line.split_whitespace();
        let name = fields.next()?;
        (fields.next()? == ACCESS_GRANTED).then_some(name)
    })
}

/// Users in order of first sighting, each carrying every database it was
/// seen in.
#[derive(Debug, Default)]
pub(super) struct UserIndex {
    users: Vec<DatabaseUser>,
    positions: HashMap<String, usize>,
}

impl UserIndex {
    /// Records that `name` can access `database`.
    pub(super) fn record(&mut self, name: &str, database: &str) {
        if let Some(user) = self
            .positions
            .get(name)
            .and_then(|position| self.users.get_mut(*position))
        {
            user.add_database(database);
            return;
        }
        self.positions.insert(name.to_owned(), self.users.len());
        self.users
            .push(DatabaseUser::new(name).with_database(database));
    }

    pub(super) fn into_users(self) -> Vec<DatabaseUser> {
        self.users
    }
}

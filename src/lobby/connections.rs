//! Registry of live connections and the users bound to them.
//!
//! One user may hold at most one connection and one connection may carry
//! at most one user; both directions are enforced at bind time.

use std::collections::HashMap;

use crate::model::{ConnectionId, UserId};

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    by_connection: HashMap<ConnectionId, Binding>,
    by_username: HashMap<String, ConnectionId>,
}

#[derive(Clone, Debug)]
struct Binding {
    user_id: UserId,
    username: String,
}

impl ConnectionRegistry {
    /// Bind `connection` to the user. Returns `false` without touching any
    /// state when the username is already connected elsewhere or the
    /// connection is already bound.
    pub fn connect(&mut self, connection: ConnectionId, user_id: UserId, username: &str) -> bool {
        if self.by_username.contains_key(username) || self.by_connection.contains_key(&connection)
        {
            return false;
        }
        self.by_username.insert(username.to_owned(), connection.clone());
        self.by_connection.insert(
            connection,
            Binding {
                user_id,
                username: username.to_owned(),
            },
        );
        true
    }

    /// Drop the binding for `connection`. Returns whether one existed.
    pub fn disconnect(&mut self, connection: &ConnectionId) -> bool {
        match self.by_connection.remove(connection) {
            Some(binding) => {
                self.by_username.remove(&binding.username);
                true
            }
            None => false,
        }
    }

    pub fn user_id_for(&self, connection: &ConnectionId) -> Option<UserId> {
        self.by_connection.get(connection).map(|b| b.user_id)
    }

    pub fn binding_for(&self, connection: &ConnectionId) -> Option<(UserId, &str)> {
        self.by_connection
            .get(connection)
            .map(|b| (b.user_id, b.username.as_str()))
    }

    pub fn connection_for(&self, username: &str) -> Option<&ConnectionId> {
        self.by_username.get(username)
    }

    pub fn is_bound(&self, connection: &ConnectionId) -> bool {
        self.by_connection.contains_key(connection)
    }
}

//! Lobby sessions: connection bindings, lobby membership and the
//! coordinator that keeps both consistent under one lock.

pub mod connections;
pub mod coordinator;
pub mod directory;

pub use connections::ConnectionRegistry;
pub use coordinator::SessionCoordinator;
pub use directory::LobbyDirectory;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::model::{ConnectionId, Lobby, LobbyId, UserId};

/// Everything the coordinator guards under its single reader/writer lock.
/// The three parts move together: a bound user is in at most one lobby,
/// and every lobby member has a live binding.
#[derive(Debug, Default)]
pub struct SessionState {
    pub(crate) connections: ConnectionRegistry,
    pub(crate) lobbies: LobbyDirectory,
    pub(crate) user_lobbies: HashMap<UserId, LobbyId>,
}

pub type SharedSessions = Arc<RwLock<SessionState>>;

impl SessionState {
    pub(crate) fn lobby_of(&self, user: UserId) -> Option<&LobbyId> {
        self.user_lobbies.get(&user)
    }

    /// Snapshot of the members of a lobby with their connections, taken
    /// while the caller holds the lock.
    pub(crate) fn members_view(&self, lobby: &LobbyId) -> Vec<MemberRef> {
        self.lobbies
            .members_of(lobby)
            .into_iter()
            .filter_map(|username| {
                let connection = match self.connections.connection_for(&username) {
                    Some(c) => c.clone(),
                    None => {
                        tracing::warn!(
                            lobby = %lobby,
                            username = %username,
                            "lobby member has no live connection, this should never happen"
                        );
                        return None;
                    }
                };
                let user_id = self.connections.user_id_for(&connection)?;
                Some(MemberRef {
                    user_id,
                    username,
                    connection,
                })
            })
            .collect()
    }

    pub(crate) fn member_connections(&self, lobby: &LobbyId) -> Vec<ConnectionId> {
        self.members_view(lobby)
            .into_iter()
            .map(|m| m.connection)
            .collect()
    }
}

/// One lobby member as seen by a locked snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberRef {
    pub user_id: UserId,
    pub username: String,
    pub connection: ConnectionId,
}

/// Outcome of a successful join: the updated lobby record, the joiner's
/// username and the connections of every member including the joiner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinedLobby {
    pub lobby: Lobby,
    pub username: String,
    pub connections: Vec<ConnectionId>,
}

/// Outcome of a successful leave. `connections` holds the members that
/// stayed behind and is empty when the lobby was deleted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeftLobby {
    pub lobby_id: LobbyId,
    pub username: String,
    pub connections: Vec<ConnectionId>,
    pub lobby_deleted: bool,
}

//! Orchestrates connection bindings and lobby membership.
//!
//! All mutating operations take the write half of one shared lock, so
//! every check-then-mutate sequence is atomic: two racing binds for the
//! same user resolve to exactly one winner.

use std::sync::Arc;

use crate::error::SessionError;
use crate::lobby::{JoinedLobby, LeftLobby, SharedSessions};
use crate::model::{ConnectionId, Lobby, LobbyId, UserId};
use crate::store::UserStore;

pub struct SessionCoordinator {
    state: SharedSessions,
    users: Arc<dyn UserStore>,
}

impl SessionCoordinator {
    pub fn new(state: SharedSessions, users: Arc<dyn UserStore>) -> Self {
        Self { state, users }
    }

    /// Create a lobby with the caller as its first member, binding the
    /// connection to the user.
    ///
    /// Fails `NotAllowed` when the connection is already bound or the
    /// username is connected elsewhere, `NotFound` when the user does not
    /// exist.
    pub async fn create_lobby(
        &self,
        connection: ConnectionId,
        name: String,
        user_id: UserId,
    ) -> Result<Lobby, SessionError> {
        {
            let state = self.state.read().await;
            if state.connections.is_bound(&connection) {
                tracing::warn!(connection = %connection, "connection is already bound to a user");
                return Err(SessionError::NotAllowed);
            }
        }

        // Fetch outside the lock; the store must not be awaited under it.
        let user = match self.users.get_by_id(user_id).await? {
            Some(user) => user,
            None => {
                tracing::warn!(user_id = %user_id, "user not found");
                return Err(SessionError::NotFound);
            }
        };

        let mut state = self.state.write().await;
        // Re-check: another task may have bound the connection since the
        // read above.
        if state.connections.is_bound(&connection) {
            tracing::warn!(connection = %connection, "connection is already bound to a user");
            return Err(SessionError::NotAllowed);
        }
        if !state.connections.connect(connection, user_id, &user.username) {
            tracing::warn!(username = %user.username, "username is already connected");
            return Err(SessionError::NotAllowed);
        }

        let mut lobby = state.lobbies.create(LobbyId::fresh(), name);
        if let Some(count) = state.lobbies.add_member(&lobby.id, &user.username) {
            lobby.user_count = count;
        }
        state.user_lobbies.insert(user_id, lobby.id.clone());

        tracing::info!(lobby = %lobby.id, username = %user.username, "lobby created");
        Ok(lobby)
    }

    /// Join an existing lobby, binding the connection to the user.
    ///
    /// Every failure is `NotFound`: unknown user, user already in a lobby,
    /// unknown lobby, or a connection/username that is already bound.
    pub async fn join_lobby(
        &self,
        connection: ConnectionId,
        lobby_id: &LobbyId,
        user_id: UserId,
    ) -> Result<JoinedLobby, SessionError> {
        let user = match self.users.get_by_id(user_id).await? {
            Some(user) => user,
            None => {
                tracing::warn!(user_id = %user_id, "user not found");
                return Err(SessionError::NotFound);
            }
        };

        let mut state = self.state.write().await;
        if state.user_lobbies.contains_key(&user_id) {
            tracing::warn!(username = %user.username, "user is already in a lobby");
            return Err(SessionError::NotFound);
        }
        let mut lobby = match state.lobbies.get(lobby_id) {
            Some(lobby) => lobby.clone(),
            None => {
                tracing::warn!(lobby = %lobby_id, "lobby not found");
                return Err(SessionError::NotFound);
            }
        };
        if !state.connections.connect(connection, user_id, &user.username) {
            tracing::warn!(username = %user.username, "connection or username is already bound");
            return Err(SessionError::NotFound);
        }

        if let Some(count) = state.lobbies.add_member(lobby_id, &user.username) {
            lobby.user_count = count;
        }
        state.user_lobbies.insert(user_id, lobby_id.clone());
        let connections = state.member_connections(lobby_id);

        tracing::info!(
            lobby = %lobby.id,
            username = %user.username,
            user_count = lobby.user_count,
            "user joined lobby"
        );
        Ok(JoinedLobby {
            lobby,
            username: user.username,
            connections,
        })
    }

    /// Remove the caller from their lobby and unbind the connection.
    /// An emptied lobby is deleted.
    pub async fn leave_lobby(&self, connection: &ConnectionId) -> Result<LeftLobby, SessionError> {
        let mut state = self.state.write().await;

        let (user_id, username) = match state.connections.binding_for(connection) {
            Some((id, name)) => (id, name.to_owned()),
            None => {
                tracing::warn!(connection = %connection, "connection is not bound to any user");
                return Err(SessionError::NotFound);
            }
        };
        let lobby_id = match state.user_lobbies.get(&user_id) {
            Some(id) => id.clone(),
            None => {
                tracing::warn!(username = %username, "user is not in any lobby");
                return Err(SessionError::NotFound);
            }
        };
        let remaining = match state.lobbies.remove_member(&lobby_id, &username) {
            Some(count) => count,
            None => {
                tracing::warn!(
                    lobby = %lobby_id,
                    "lobby record missing for a tracked membership, this should never happen"
                );
                return Err(SessionError::NotFound);
            }
        };
        state.user_lobbies.remove(&user_id);

        let lobby_deleted = remaining == 0;
        if lobby_deleted {
            state.lobbies.remove(&lobby_id);
            tracing::info!(lobby = %lobby_id, "lobby deleted, last member left");
        }

        // Compute who is left to notify before the unbind below.
        let connections = state.member_connections(&lobby_id);
        state.connections.disconnect(connection);

        tracing::info!(lobby = %lobby_id, username = %username, remaining, "user left lobby");
        Ok(LeftLobby {
            lobby_id,
            username,
            connections,
            lobby_deleted,
        })
    }

    pub async fn list_lobbies(&self) -> Vec<Lobby> {
        self.state.read().await.lobbies.list_all()
    }

    pub async fn get_lobby(&self, lobby_id: &LobbyId) -> Option<Lobby> {
        self.state.read().await.lobbies.get(lobby_id).cloned()
    }

    /// Usernames in a lobby; unknown lobbies yield an empty list.
    pub async fn users_in_lobby(&self, lobby_id: &LobbyId) -> Vec<String> {
        let state = self.state.read().await;
        if state.lobbies.get(lobby_id).is_none() {
            tracing::warn!(lobby = %lobby_id, "lobby not found");
            return Vec::new();
        }
        state.lobbies.members_of(lobby_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lobby::SessionState;
    use crate::model::Role;
    use crate::store::MemoryStore;
    use tokio::sync::RwLock;

    fn conn(label: &str) -> ConnectionId {
        ConnectionId(label.to_owned())
    }

    async fn setup() -> (SessionCoordinator, UserId, UserId) {
        let users: Arc<dyn UserStore> = Arc::new(MemoryStore::new());
        let alice = users.add("alice".into(), Role::User).await.unwrap();
        let bob = users.add("bob".into(), Role::User).await.unwrap();
        let coordinator =
            SessionCoordinator::new(Arc::new(RwLock::new(SessionState::default())), users);
        (coordinator, alice.id, bob.id)
    }

    #[tokio::test]
    async fn create_binds_creator_as_first_member() {
        let (coordinator, alice, _) = setup().await;

        let lobby = coordinator
            .create_lobby(conn("c1"), "Party".into(), alice)
            .await
            .unwrap();

        assert_eq!(lobby.name, "Party");
        assert_eq!(lobby.user_count, 1);
        assert_eq!(coordinator.users_in_lobby(&lobby.id).await, vec!["alice"]);
        assert_eq!(coordinator.list_lobbies().await, vec![lobby]);
    }

    #[tokio::test]
    async fn create_requires_a_known_user() {
        let (coordinator, _, _) = setup().await;

        let err = coordinator
            .create_lobby(conn("c1"), "Party".into(), UserId(99))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn bound_connection_cannot_create_again() {
        let (coordinator, alice, bob) = setup().await;
        coordinator
            .create_lobby(conn("c1"), "Party".into(), alice)
            .await
            .unwrap();

        let err = coordinator
            .create_lobby(conn("c1"), "Second".into(), bob)
            .await
            .unwrap_err();
        assert!(err.is_not_allowed());
    }

    #[tokio::test]
    async fn connected_username_cannot_bind_twice() {
        let (coordinator, alice, _) = setup().await;
        coordinator
            .create_lobby(conn("c1"), "Party".into(), alice)
            .await
            .unwrap();

        // Same user from a fresh connection.
        let err = coordinator
            .create_lobby(conn("c2"), "Second".into(), alice)
            .await
            .unwrap_err();
        assert!(err.is_not_allowed());
    }

    #[tokio::test]
    async fn join_reports_all_member_connections() {
        let (coordinator, alice, bob) = setup().await;
        let lobby = coordinator
            .create_lobby(conn("host"), "Party".into(), alice)
            .await
            .unwrap();

        let joined = coordinator
            .join_lobby(conn("guest"), &lobby.id, bob)
            .await
            .unwrap();

        assert_eq!(joined.username, "bob");
        assert_eq!(joined.lobby.user_count, 2);
        assert!(joined.connections.contains(&conn("host")));
        assert!(joined.connections.contains(&conn("guest")));
    }

    #[tokio::test]
    async fn join_rejects_unknown_lobby_and_double_membership() {
        let (coordinator, alice, bob) = setup().await;

        let err = coordinator
            .join_lobby(conn("c1"), &LobbyId("nope".into()), alice)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let lobby = coordinator
            .create_lobby(conn("host"), "Party".into(), alice)
            .await
            .unwrap();
        coordinator
            .join_lobby(conn("guest"), &lobby.id, bob)
            .await
            .unwrap();

        // Bob is already in a lobby, even from another connection.
        let err = coordinator
            .join_lobby(conn("other"), &lobby.id, bob)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn racing_binds_resolve_to_one_winner() {
        let (coordinator, alice, bob) = setup().await;
        let lobby = coordinator
            .create_lobby(conn("host"), "Party".into(), alice)
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            coordinator.join_lobby(conn("racer"), &lobby.id, bob),
            coordinator.join_lobby(conn("racer"), &lobby.id, bob),
        );
        assert!(a.is_ok() != b.is_ok());
        assert_eq!(coordinator.users_in_lobby(&lobby.id).await.len(), 2);
    }

    #[tokio::test]
    async fn leaving_notifies_the_rest_and_unbinds() {
        let (coordinator, alice, bob) = setup().await;
        let lobby = coordinator
            .create_lobby(conn("host"), "Party".into(), alice)
            .await
            .unwrap();
        coordinator
            .join_lobby(conn("guest"), &lobby.id, bob)
            .await
            .unwrap();

        let left = coordinator.leave_lobby(&conn("guest")).await.unwrap();
        assert_eq!(left.username, "bob");
        assert!(!left.lobby_deleted);
        assert_eq!(left.connections, vec![conn("host")]);

        // The guest connection is free again.
        coordinator
            .join_lobby(conn("guest"), &lobby.id, bob)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn last_leave_deletes_the_lobby() {
        let (coordinator, alice, _) = setup().await;
        let lobby = coordinator
            .create_lobby(conn("host"), "Party".into(), alice)
            .await
            .unwrap();

        let left = coordinator.leave_lobby(&conn("host")).await.unwrap();
        assert!(left.lobby_deleted);
        assert!(left.connections.is_empty());
        assert!(coordinator.get_lobby(&lobby.id).await.is_none());
        assert!(coordinator.users_in_lobby(&lobby.id).await.is_empty());
    }

    #[tokio::test]
    async fn leave_requires_a_bound_connection() {
        let (coordinator, _, _) = setup().await;

        let err = coordinator.leave_lobby(&conn("ghost")).await.unwrap_err();
        assert!(err.is_not_found());
    }
}

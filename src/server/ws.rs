//! WebSocket transport: one task per socket, hub-style dispatch.
//!
//! Incoming messages are handled in order; the reply goes back on the
//! same socket while lobby events fan out through [`Fanout`] sinks.
//! Dropping the socket triggers the same cleanup as an explicit leave.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::StreamExt;

use crate::accounts;
use crate::error::SessionError;
use crate::model::{Case, ConnectionId, Sound, User, UserId, MAX_NAME_LEN, MAX_USERNAME_LEN};
use crate::protocol::{ClientMsg, ErrorCode, ServerMsg};
use crate::rewards::{OpenOutcome, PlayOutcome};
use crate::server::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let connection = ConnectionId::fresh();
    let mut events = state.fanout.register(connection.clone()).await;
    let online = state.fanout.connected().await;
    tracing::info!(connection = %connection, online, "client connected");

    // Set by a successful Hello; identity outlives lobby membership.
    let mut session: Option<User> = None;

    loop {
        tokio::select! {
            biased;

            event = events.recv() => {
                match event {
                    Some(msg) => send_ws(&mut socket, &msg).await,
                    None => break,
                }
            }

            incoming = socket.next() => {
                match incoming {
                    Some(Ok(Message::Text(raw))) => {
                        match serde_json::from_str::<ClientMsg>(&raw) {
                            Ok(msg) => {
                                let reply =
                                    handle_client_msg(&state, &connection, &mut session, msg).await;
                                send_ws(&mut socket, &reply).await;
                            }
                            Err(err) => {
                                tracing::warn!(connection = %connection, error = %err, "unparseable client message");
                                tracing::debug!(raw_in = %raw);
                                send_ws(
                                    &mut socket,
                                    &ServerMsg::error(ErrorCode::Invalid, "malformed message"),
                                )
                                .await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    hangup(&state, &connection, session.as_ref()).await;
}

/// Disconnect cleanup: leave the lobby as if the client had asked to,
/// then drop the sink.
async fn hangup(state: &AppState, connection: &ConnectionId, session: Option<&User>) {
    match state.sessions.leave_lobby(connection).await {
        Ok(left) => {
            let _ = state
                .notify
                .send(
                    &left.connections,
                    ServerMsg::UserLeft {
                        lobby_id: left.lobby_id.clone(),
                        username: left.username.clone(),
                    },
                )
                .await;
            if left.lobby_deleted {
                let _ = state
                    .notify
                    .broadcast_except(
                        connection,
                        ServerMsg::LobbyClosed {
                            lobby_id: left.lobby_id,
                        },
                    )
                    .await;
            }
        }
        // Not bound or not in a lobby; nothing to clean up.
        Err(SessionError::NotFound) => {}
        Err(err) => {
            tracing::error!(connection = %connection, error = %err, "leave on disconnect failed");
        }
    }
    state.fanout.unregister(connection).await;

    match session {
        Some(user) => {
            tracing::info!(connection = %connection, username = %user.username, "client disconnected")
        }
        None => tracing::info!(connection = %connection, "client disconnected"),
    }
}

/// Handle one client message and produce the direct reply. Lobby events
/// are pushed to the affected members' sinks along the way.
pub(crate) async fn handle_client_msg(
    state: &AppState,
    connection: &ConnectionId,
    session: &mut Option<User>,
    msg: ClientMsg,
) -> ServerMsg {
    if let ClientMsg::Hello { username } = msg {
        return hello(state, session, username).await;
    }
    let user = match session {
        Some(user) => user.clone(),
        None => return ServerMsg::error(ErrorCode::NotAllowed, "say Hello first"),
    };
    dispatch(state, connection, &user, msg).await
}

async fn hello(state: &AppState, session: &mut Option<User>, username: String) -> ServerMsg {
    if session.is_some() {
        return ServerMsg::error(ErrorCode::NotAllowed, "already identified");
    }
    let username = username.trim().to_owned();
    if !accounts::valid_username(&username) {
        return ServerMsg::error(
            ErrorCode::Invalid,
            format!("username must be 1..={MAX_USERNAME_LEN} characters"),
        );
    }

    let (user, created) = match accounts::register_or_fetch(&state.stores.users, &username).await {
        Ok(pair) => pair,
        Err(err) => return error_reply(err, "register"),
    };
    if created {
        if let Err(err) = state.rewards.grant_starter_cases(user.id).await {
            return error_reply(err, "grant starter cases");
        }
    }

    let (sounds, cases) = match load_inventory(state, user.id).await {
        Ok(inventory) => inventory,
        Err(err) => return error_reply(err, "load inventory"),
    };
    *session = Some(user.clone());
    ServerMsg::Welcome {
        user,
        sounds,
        cases,
    }
}

async fn dispatch(
    state: &AppState,
    connection: &ConnectionId,
    user: &User,
    msg: ClientMsg,
) -> ServerMsg {
    match msg {
        // Intercepted by handle_client_msg.
        ClientMsg::Hello { .. } => ServerMsg::error(ErrorCode::NotAllowed, "already identified"),

        ClientMsg::CreateLobby { name } => {
            let name = name.trim().to_owned();
            if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
                return ServerMsg::error(
                    ErrorCode::Invalid,
                    format!("lobby name must be 1..={MAX_NAME_LEN} characters"),
                );
            }
            match state.sessions.create_lobby(connection.clone(), name, user.id).await {
                Ok(lobby) => {
                    let _ = state
                        .notify
                        .broadcast_except(connection, ServerMsg::LobbyCreated { lobby: lobby.clone() })
                        .await;
                    ServerMsg::LobbyCreated { lobby }
                }
                Err(err) => error_reply(err, "create lobby"),
            }
        }

        ClientMsg::JoinLobby { lobby_id } => {
            match state.sessions.join_lobby(connection.clone(), &lobby_id, user.id).await {
                Ok(joined) => {
                    let others: Vec<ConnectionId> = joined
                        .connections
                        .iter()
                        .filter(|c| *c != connection)
                        .cloned()
                        .collect();
                    let _ = state
                        .notify
                        .send(
                            &others,
                            ServerMsg::UserJoined {
                                lobby_id: joined.lobby.id.clone(),
                                username: joined.username.clone(),
                            },
                        )
                        .await;
                    ServerMsg::JoinedLobby { lobby: joined.lobby }
                }
                Err(err) => error_reply(err, "join lobby"),
            }
        }

        ClientMsg::LeaveLobby => match state.sessions.leave_lobby(connection).await {
            Ok(left) => {
                let _ = state
                    .notify
                    .send(
                        &left.connections,
                        ServerMsg::UserLeft {
                            lobby_id: left.lobby_id.clone(),
                            username: left.username.clone(),
                        },
                    )
                    .await;
                if left.lobby_deleted {
                    let _ = state
                        .notify
                        .broadcast_except(
                            connection,
                            ServerMsg::LobbyClosed {
                                lobby_id: left.lobby_id.clone(),
                            },
                        )
                        .await;
                }
                ServerMsg::LeftLobby {
                    lobby_id: left.lobby_id,
                    lobby_deleted: left.lobby_deleted,
                }
            }
            Err(err) => error_reply(err, "leave lobby"),
        },

        ClientMsg::ListLobbies => ServerMsg::Lobbies {
            lobbies: state.sessions.list_lobbies().await,
        },

        ClientMsg::ListUsers { lobby_id } => {
            let usernames = state.sessions.users_in_lobby(&lobby_id).await;
            ServerMsg::LobbyUsers {
                lobby_id,
                usernames,
            }
        }

        ClientMsg::PlaySound { sound_id } => {
            match state.rewards.play_sound(sound_id, connection).await {
                Ok(outcome) => {
                    let (played, minted) = match outcome {
                        PlayOutcome::Played(played) => (played, Vec::new()),
                        PlayOutcome::CaseObtained { played, minted } => (played, minted),
                    };
                    let event = ServerMsg::SoundPlayed {
                        username: played.username.clone(),
                        file_path: played.file_path.clone(),
                    };
                    let others: Vec<ConnectionId> = played
                        .connections
                        .iter()
                        .filter(|c| *c != connection)
                        .cloned()
                        .collect();
                    let _ = state.notify.send(&others, event).await;
                    // Case drops go to each owner, the player included.
                    for drop in &minted {
                        let _ = state
                            .notify
                            .send(
                                std::slice::from_ref(&drop.connection),
                                ServerMsg::CaseObtained {
                                    case: drop.case.clone(),
                                },
                            )
                            .await;
                    }
                    ServerMsg::SoundPlayed {
                        username: played.username,
                        file_path: played.file_path,
                    }
                }
                Err(err) => error_reply(err, "play sound"),
            }
        }

        ClientMsg::OpenCase { case_id } => {
            match state.rewards.open_case(case_id, user.id).await {
                Ok(OpenOutcome::Opened(sound)) => ServerMsg::CaseOpened {
                    case_id,
                    sound: Some(sound),
                },
                Ok(OpenOutcome::Empty) => ServerMsg::CaseOpened {
                    case_id,
                    sound: None,
                },
                Err(err) => error_reply(err, "open case"),
            }
        }

        ClientMsg::GetInventory => match load_inventory(state, user.id).await {
            Ok((sounds, cases)) => ServerMsg::Inventory { sounds, cases },
            Err(err) => error_reply(err, "load inventory"),
        },
    }
}

async fn load_inventory(
    state: &AppState,
    user_id: UserId,
) -> Result<(Vec<Sound>, Vec<Case>), SessionError> {
    let sounds = state.stores.sounds.list_by_owner(user_id).await?;
    let cases = state.stores.cases.list_by_owner(user_id).await?;
    Ok((sounds, cases))
}

fn error_reply(err: SessionError, what: &str) -> ServerMsg {
    match err {
        SessionError::NotFound => ServerMsg::error(ErrorCode::NotFound, format!("{what}: not found")),
        SessionError::NotAllowed => {
            ServerMsg::error(ErrorCode::NotAllowed, format!("{what}: not allowed"))
        }
        SessionError::Store(err) => {
            tracing::error!(error = %err, "{what} failed in the store");
            ServerMsg::error(ErrorCode::Internal, "internal error")
        }
    }
}

async fn send_ws(socket: &mut WebSocket, msg: &ServerMsg) {
    match serde_json::to_string(msg) {
        Ok(raw) => {
            if let Err(err) = socket.send(Message::Text(raw)).await {
                tracing::debug!(error = %err, "failed to send on ws");
            }
        }
        Err(err) => tracing::error!(error = %err, "failed to serialize server message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::LobbyId;

    fn test_state() -> AppState {
        let mut config = Config::default();
        config.bonus_case_chance = 0.0;
        AppState::new(config).unwrap()
    }

    fn conn(label: &str) -> ConnectionId {
        ConnectionId(label.to_owned())
    }

    async fn say_hello(state: &AppState, connection: &ConnectionId, name: &str) -> Option<User> {
        let mut session = None;
        let reply = handle_client_msg(
            state,
            connection,
            &mut session,
            ClientMsg::Hello {
                username: name.into(),
            },
        )
        .await;
        assert!(matches!(reply, ServerMsg::Welcome { .. }), "got {reply:?}");
        session
    }

    #[tokio::test]
    async fn hello_registers_and_grants_starter_cases() {
        let state = test_state();
        let mut session = None;

        let reply = handle_client_msg(
            &state,
            &conn("c1"),
            &mut session,
            ClientMsg::Hello {
                username: "alice".into(),
            },
        )
        .await;

        let (user, sounds, cases) = match reply {
            ServerMsg::Welcome {
                user,
                sounds,
                cases,
            } => (user, sounds, cases),
            other => panic!("expected Welcome, got {other:?}"),
        };
        assert_eq!(user.username, "alice");
        assert!(sounds.is_empty());
        assert_eq!(cases.len(), state.config.starter_cases);
        assert!(session.is_some());
    }

    #[tokio::test]
    async fn hello_is_required_and_single() {
        let state = test_state();
        let mut session = None;

        let reply =
            handle_client_msg(&state, &conn("c1"), &mut session, ClientMsg::ListLobbies).await;
        assert!(matches!(
            reply,
            ServerMsg::Error {
                code: ErrorCode::NotAllowed,
                ..
            }
        ));

        let mut session = say_hello(&state, &conn("c1"), "alice").await;
        let reply = handle_client_msg(
            &state,
            &conn("c1"),
            &mut session,
            ClientMsg::Hello {
                username: "bob".into(),
            },
        )
        .await;
        assert!(matches!(
            reply,
            ServerMsg::Error {
                code: ErrorCode::NotAllowed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn blank_and_oversized_usernames_are_invalid() {
        let state = test_state();
        let oversized = "x".repeat(31);

        for bad in ["", "   ", oversized.as_str()] {
            let mut session = None;
            let reply = handle_client_msg(
                &state,
                &conn("c1"),
                &mut session,
                ClientMsg::Hello {
                    username: bad.into(),
                },
            )
            .await;
            assert!(
                matches!(
                    reply,
                    ServerMsg::Error {
                        code: ErrorCode::Invalid,
                        ..
                    }
                ),
                "accepted {bad:?}"
            );
            assert!(session.is_none());
        }
    }

    #[tokio::test]
    async fn returning_user_keeps_their_inventory() {
        let state = test_state();

        let first = say_hello(&state, &conn("c1"), "alice").await.unwrap();
        let mut session = None;
        let reply = handle_client_msg(
            &state,
            &conn("c2"),
            &mut session,
            ClientMsg::Hello {
                username: "alice".into(),
            },
        )
        .await;

        let (user, cases) = match reply {
            ServerMsg::Welcome { user, cases, .. } => (user, cases),
            other => panic!("expected Welcome, got {other:?}"),
        };
        assert_eq!(user.id, first.id);
        // No second starter grant.
        assert_eq!(cases.len(), state.config.starter_cases);
    }

    #[tokio::test]
    async fn create_join_and_events_flow() {
        let state = test_state();
        let host = conn("host");
        let guest = conn("guest");
        let mut host_events = state.fanout.register(host.clone()).await;
        let mut guest_events = state.fanout.register(guest.clone()).await;

        let mut host_session = say_hello(&state, &host, "alice").await;
        let mut guest_session = say_hello(&state, &guest, "bob").await;

        let reply = handle_client_msg(
            &state,
            &host,
            &mut host_session,
            ClientMsg::CreateLobby {
                name: "Party".into(),
            },
        )
        .await;
        let lobby = match reply {
            ServerMsg::LobbyCreated { lobby } => lobby,
            other => panic!("expected LobbyCreated, got {other:?}"),
        };
        assert_eq!(lobby.user_count, 1);

        // The creator hears about it via the reply, everyone else via
        // the event.
        assert_eq!(
            guest_events.recv().await,
            Some(ServerMsg::LobbyCreated {
                lobby: lobby.clone()
            })
        );
        assert!(host_events.try_recv().is_err());

        let reply = handle_client_msg(
            &state,
            &guest,
            &mut guest_session,
            ClientMsg::JoinLobby {
                lobby_id: lobby.id.clone(),
            },
        )
        .await;
        match reply {
            ServerMsg::JoinedLobby { lobby } => assert_eq!(lobby.user_count, 2),
            other => panic!("expected JoinedLobby, got {other:?}"),
        }
        assert_eq!(
            host_events.recv().await,
            Some(ServerMsg::UserJoined {
                lobby_id: lobby.id.clone(),
                username: "bob".into(),
            })
        );
        assert!(guest_events.try_recv().is_err());

        let reply =
            handle_client_msg(&state, &guest, &mut guest_session, ClientMsg::LeaveLobby).await;
        assert_eq!(
            reply,
            ServerMsg::LeftLobby {
                lobby_id: lobby.id.clone(),
                lobby_deleted: false,
            }
        );
        assert_eq!(
            host_events.recv().await,
            Some(ServerMsg::UserLeft {
                lobby_id: lobby.id.clone(),
                username: "bob".into(),
            })
        );

        let reply =
            handle_client_msg(&state, &host, &mut host_session, ClientMsg::LeaveLobby).await;
        assert_eq!(
            reply,
            ServerMsg::LeftLobby {
                lobby_id: lobby.id.clone(),
                lobby_deleted: true,
            }
        );
        // The close is broadcast to everyone else.
        assert_eq!(
            guest_events.recv().await,
            Some(ServerMsg::LobbyClosed {
                lobby_id: lobby.id.clone(),
            })
        );
    }

    #[tokio::test]
    async fn open_case_then_play_reaches_the_lobby() {
        let state = test_state();
        let host = conn("host");
        let guest = conn("guest");
        let _host_events = state.fanout.register(host.clone()).await;
        let mut guest_events = state.fanout.register(guest.clone()).await;

        let mut host_session = say_hello(&state, &host, "alice").await;
        let mut guest_session = say_hello(&state, &guest, "bob").await;

        // Open a starter case to obtain a playable sound.
        let case_id = match &host_session {
            Some(user) => state.stores.cases.list_by_owner(user.id).await.unwrap()[0].id,
            None => unreachable!(),
        };
        let reply = handle_client_msg(
            &state,
            &host,
            &mut host_session,
            ClientMsg::OpenCase { case_id },
        )
        .await;
        let sound = match reply {
            ServerMsg::CaseOpened {
                sound: Some(sound), ..
            } => sound,
            other => panic!("expected an opened case, got {other:?}"),
        };

        let reply = handle_client_msg(
            &state,
            &host,
            &mut host_session,
            ClientMsg::CreateLobby {
                name: "Party".into(),
            },
        )
        .await;
        let lobby = match reply {
            ServerMsg::LobbyCreated { lobby } => lobby,
            other => panic!("expected LobbyCreated, got {other:?}"),
        };
        guest_events.try_recv().ok(); // drop the LobbyCreated event
        handle_client_msg(
            &state,
            &guest,
            &mut guest_session,
            ClientMsg::JoinLobby {
                lobby_id: lobby.id.clone(),
            },
        )
        .await;

        let reply = handle_client_msg(
            &state,
            &host,
            &mut host_session,
            ClientMsg::PlaySound { sound_id: sound.id },
        )
        .await;
        match &reply {
            ServerMsg::SoundPlayed {
                username,
                file_path,
            } => {
                assert_eq!(username, "alice");
                assert_eq!(file_path, &sound.file_path);
            }
            other => panic!("expected SoundPlayed, got {other:?}"),
        }
        assert_eq!(guest_events.recv().await, Some(reply));

        // Playing it again immediately trips the cooldown.
        let reply = handle_client_msg(
            &state,
            &host,
            &mut host_session,
            ClientMsg::PlaySound { sound_id: sound.id },
        )
        .await;
        assert!(matches!(
            reply,
            ServerMsg::Error {
                code: ErrorCode::NotAllowed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn lobby_queries_answer_without_membership() {
        let state = test_state();
        let mut session = say_hello(&state, &conn("c1"), "alice").await;

        let reply =
            handle_client_msg(&state, &conn("c1"), &mut session, ClientMsg::ListLobbies).await;
        assert_eq!(reply, ServerMsg::Lobbies { lobbies: vec![] });

        let reply = handle_client_msg(
            &state,
            &conn("c1"),
            &mut session,
            ClientMsg::ListUsers {
                lobby_id: LobbyId("nope".into()),
            },
        )
        .await;
        assert_eq!(
            reply,
            ServerMsg::LobbyUsers {
                lobby_id: LobbyId("nope".into()),
                usernames: vec![],
            }
        );
    }
}

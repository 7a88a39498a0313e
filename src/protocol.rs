//! Client/server wire protocol.
//!
//! Every message is a JSON object `{"type": ..., "data": ...}`; the tag is
//! the event name clients subscribe to. Replies go to the caller only,
//! events fan out to the affected lobby members.

use serde::{Deserialize, Serialize};

use crate::model::{Case, CaseId, Lobby, LobbyId, Sound, SoundId, User};

/// Messages a client sends to the server.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum ClientMsg {
    /// First message of every session: identify by username.
    Hello { username: String },
    CreateLobby { name: String },
    JoinLobby { lobby_id: LobbyId },
    LeaveLobby,
    ListLobbies,
    ListUsers { lobby_id: LobbyId },
    PlaySound { sound_id: SoundId },
    OpenCase { case_id: CaseId },
    GetInventory,
}

/// Messages the server sends to clients, both as direct replies and as
/// lobby-wide events.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum ServerMsg {
    /// Reply to `Hello`, carrying the account and its full inventory.
    Welcome {
        user: User,
        sounds: Vec<Sound>,
        cases: Vec<Case>,
    },
    /// Reply to the creator and event for everyone else.
    LobbyCreated { lobby: Lobby },
    /// Reply to a successful join.
    JoinedLobby { lobby: Lobby },
    /// Reply to a successful leave.
    LeftLobby { lobby_id: LobbyId, lobby_deleted: bool },
    Lobbies { lobbies: Vec<Lobby> },
    LobbyUsers {
        lobby_id: LobbyId,
        usernames: Vec<String>,
    },
    /// Event: someone joined the receiver's lobby.
    UserJoined { lobby_id: LobbyId, username: String },
    /// Event: someone left the receiver's lobby.
    UserLeft { lobby_id: LobbyId, username: String },
    /// Event: a lobby emptied out and was deleted.
    LobbyClosed { lobby_id: LobbyId },
    /// Reply and event: a lobby member played a sound.
    SoundPlayed { username: String, file_path: String },
    /// Event: a bonus case landed in the receiver's inventory.
    CaseObtained { case: Case },
    /// Reply to `OpenCase`. `sound` is `None` when the template had an
    /// empty reward pool.
    CaseOpened {
        case_id: CaseId,
        sound: Option<Sound>,
    },
    Inventory {
        sounds: Vec<Sound>,
        cases: Vec<Case>,
    },
    Error { code: ErrorCode, message: String },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,
    NotAllowed,
    Invalid,
    Internal,
}

impl ServerMsg {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMsg::Error {
            code,
            message: message.into(),
        }
    }
}

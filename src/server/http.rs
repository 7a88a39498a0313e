//! Read-only HTTP views of the lobby directory.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::model::LobbyId;
use crate::server::state::AppState;

pub async fn list_lobbies(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.sessions.list_lobbies().await)
}

pub async fn get_lobby(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.sessions.get_lobby(&LobbyId(id)).await {
        Some(lobby) => (StatusCode::OK, Json(lobby)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "lobby not found" })),
        )
            .into_response(),
    }
}

pub async fn lobby_users(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    Json(state.sessions.users_in_lobby(&LobbyId(id)).await)
}

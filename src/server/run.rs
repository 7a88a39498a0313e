//! Router assembly and server startup.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::services::ServeDir;

use crate::server::state::AppState;
use crate::server::{http, ws};

pub fn build_router(state: AppState) -> Router {
    let media = ServeDir::new(state.config.media_dir.clone());
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({ "ok": true })) }))
        .route("/ws", get(ws::ws_handler))
        .route("/api/lobbies", get(http::list_lobbies))
        .route("/api/lobbies/:id", get(http::get_lobby))
        .route("/api/lobbies/:id/users", get(http::lobby_users))
        .nest_service("/media", media)
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = build_router(state);

    let display_addr = if addr.ip().is_loopback() {
        format!("localhost:{}", addr.port())
    } else {
        addr.to_string()
    };
    tracing::info!(addr = %addr, "soundcase server running");
    println!("ws endpoint:  ws://{display_addr}/ws");
    println!("lobby list:   http://{display_addr}/api/lobbies");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app).await.context("serving HTTP")?;
    Ok(())
}

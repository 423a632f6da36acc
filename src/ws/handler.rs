//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;

/// `GET /subscribe` — Upgrade HTTP connection to WebSocket.
pub async fn subscribe_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let service = state.pubsub_service;

    ws.on_failed_upgrade(|error| {
        tracing::warn!(%error, "failed to upgrade connection");
    })
    .on_upgrade(move |socket| run_connection(socket, service))
}

//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::Response;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::HubError;

/// `GET /ws` — Upgrade an authenticated HTTP connection to WebSocket.
///
/// The session is resolved before the handshake; unauthenticated requests
/// get `401` and never reach the hub.
///
/// # Errors
///
/// Returns [`HubError::Unauthorized`] without a valid session and
/// [`HubError::HubClosed`] once the hub has shut down.
pub async fn ws_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ws: WebSocketUpgrade,
) -> Result<Response, HubError> {
    if state.hub.is_closed() {
        return Err(HubError::HubClosed);
    }
    tracing::debug!(user_id = %user, "upgrading websocket");

    let hub = state.hub.clone();
    let policy = state.inbound_policy;
    let inbound_limit = state.inbound_limit;
    Ok(ws
        .max_message_size(state.max_frame_bytes)
        .on_failed_upgrade(|err| tracing::warn!(error = %err, "websocket upgrade failed"))
        .on_upgrade(move |socket| run_connection(socket, hub, user, policy, inbound_limit)))
}

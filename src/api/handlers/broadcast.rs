//! Direct broadcast dispatch for CRUD actions that must notify peers live.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

use crate::api::dto::{BroadcastRequest, DispatchAccepted};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::config::RateLimit;
use crate::domain::Frame;
use crate::error::{ErrorResponse, HubError};

/// `POST /broadcast` — Fan a chat message out to every connection.
///
/// # Errors
///
/// Returns [`HubError::InvalidRequest`] for empty or oversized content and
/// [`HubError::HubClosed`] after shutdown.
#[utoipa::path(
    post,
    path = "/api/v1/broadcast",
    tag = "Dispatch",
    summary = "Broadcast a message frame",
    description = "Wraps `content` in a `message` frame and fans it out to every live connection, the caller's included.",
    request_body = BroadcastRequest,
    responses(
        (status = 202, description = "Broadcast dispatched", body = DispatchAccepted),
        (status = 400, description = "Empty or oversized content", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 429, description = "Too many broadcasts from this address"),
        (status = 503, description = "Hub is shut down", body = ErrorResponse),
    )
)]
pub async fn broadcast(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(req): Json<BroadcastRequest>,
) -> Result<impl IntoResponse, HubError> {
    if req.content.trim().is_empty() {
        return Err(HubError::InvalidRequest("content must not be empty".to_string()));
    }
    if req.content.len() > state.max_frame_bytes {
        return Err(HubError::InvalidRequest(format!(
            "content exceeds {} bytes",
            state.max_frame_bytes
        )));
    }

    tracing::debug!(user_id = %caller, bytes = req.content.len(), "broadcast dispatched");
    state.hub.broadcast(Frame::message(req.content)).await?;
    Ok((StatusCode::ACCEPTED, Json(DispatchAccepted::new("broadcast"))))
}

/// Dispatch routes, throttled per client IP.
///
/// The key is the peer address, so the server must be started with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn routes(limit: RateLimit) -> Router<AppState> {
    let router = Router::new().route("/broadcast", post(broadcast));
    let Some(config) = GovernorConfigBuilder::default()
        .key_extractor(PeerIpKeyExtractor)
        .period(limit.period)
        .burst_size(limit.burst)
        .finish()
    else {
        tracing::warn!(?limit, "invalid broadcast rate limit; throttling disabled");
        return router;
    };
    let config = Arc::new(config);

    // Forget idle addresses once a minute.
    let limiter = Arc::downgrade(config.limiter());
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            let Some(limiter) = limiter.upgrade() else {
                break;
            };
            limiter.retain_recent();
        }
    });

    router.layer(GovernorLayer { config })
}

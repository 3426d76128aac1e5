//! Presence handlers: who is online, and login/logout dispatch.
//!
//! The CRUD login and logout flows call these after they have created or
//! destroyed the session; the hub itself never creates a connection here.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{DispatchAccepted, PresenceListResponse};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HubError};

/// `GET /presence` — List online users.
///
/// # Errors
///
/// Returns [`HubError::HubClosed`] after shutdown.
#[utoipa::path(
    get,
    path = "/api/v1/presence",
    tag = "Presence",
    summary = "List online users",
    description = "Returns every user holding at least one live WebSocket connection, with connection counts.",
    responses(
        (status = 200, description = "Online users", body = PresenceListResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 503, description = "Hub is shut down", body = ErrorResponse),
    )
)]
pub async fn list_presence(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> Result<impl IntoResponse, HubError> {
    let members = state.hub.members().await?;
    Ok(Json(PresenceListResponse::from_members(members)))
}

/// `POST /presence/login` — Announce the caller as online.
///
/// Emits `user_connected` only if the caller already has a live
/// connection.
///
/// # Errors
///
/// Returns [`HubError::HubClosed`] after shutdown.
#[utoipa::path(
    post,
    path = "/api/v1/presence/login",
    tag = "Presence",
    summary = "Dispatch login presence",
    responses(
        (status = 202, description = "Login dispatched", body = DispatchAccepted),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 503, description = "Hub is shut down", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<impl IntoResponse, HubError> {
    state.hub.login(caller).await?;
    Ok((StatusCode::ACCEPTED, Json(DispatchAccepted::new("login"))))
}

/// `POST /presence/logout` — Close every connection of the caller.
///
/// # Errors
///
/// Returns [`HubError::HubClosed`] after shutdown.
#[utoipa::path(
    post,
    path = "/api/v1/presence/logout",
    tag = "Presence",
    summary = "Dispatch logout presence",
    description = "Closes every WebSocket held by the caller; remaining users receive one user_disconnected per closed connection.",
    responses(
        (status = 202, description = "Logout dispatched", body = DispatchAccepted),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 503, description = "Hub is shut down", body = ErrorResponse),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<impl IntoResponse, HubError> {
    tracing::info!(user_id = %caller, "logout dispatched");
    state.hub.logout(caller).await?;
    Ok((StatusCode::ACCEPTED, Json(DispatchAccepted::new("logout"))))
}

/// Presence routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/presence", get(list_presence))
        .route("/presence/login", post(login))
        .route("/presence/logout", post(logout))
}

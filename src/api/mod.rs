//! REST API layer: route handlers, DTOs, OpenAPI document, and the
//! top-level application router.
//!
//! Dispatch endpoints are mounted under `/api/v1`; `/health` and `/ws`
//! live at the root.

pub mod dto;
pub mod handlers;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::config::RateLimit;
use crate::ws::handler::ws_handler;

/// Upper bound on a single REST request. Not applied to `/ws`.
const REST_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenAPI document for the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "forum-hub",
        description = "Presence and live-notification hub for the forum backend"
    ),
    paths(
        handlers::system::health_handler,
        handlers::presence::list_presence,
        handlers::presence::login,
        handlers::presence::logout,
        handlers::broadcast::broadcast,
    ),
    components(schemas(
        handlers::system::HealthResponse,
        dto::OnlineUserDto,
        dto::PresenceListResponse,
        dto::BroadcastRequest,
        dto::DispatchAccepted,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
        crate::domain::Frame,
        crate::domain::FrameKind,
    )),
    tags(
        (name = "System", description = "Service health"),
        (name = "Presence", description = "Online users and login/logout dispatch"),
        (name = "Dispatch", description = "Direct frame broadcast"),
    )
)]
pub struct ApiDoc;

/// Builds the REST router with all endpoints.
pub fn build_router(broadcast_limit: RateLimit) -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes(broadcast_limit))
        .merge(handlers::system::routes())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REST_TIMEOUT,
        ))
}

/// Builds the complete application: REST, the `/ws` upgrade endpoint,
/// tracing and CORS layers, and the Swagger UI when enabled.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()`;
/// the broadcast throttle keys on the peer address.
pub fn build_app(state: AppState) -> Router {
    let app = Router::new()
        .merge(build_router(state.broadcast_limit))
        .route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let app = app.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
    .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_dispatch_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/v1/presence",
            "/api/v1/presence/login",
            "/api/v1/presence/logout",
            "/api/v1/broadcast",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}

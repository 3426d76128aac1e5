//! REST endpoint handlers organized by resource.

pub mod broadcast;
pub mod presence;
pub mod system;

use axum::Router;

use crate::app_state::AppState;
use crate::config::RateLimit;

/// Composes all resource routes under `/api/v1`.
pub fn routes(broadcast_limit: RateLimit) -> Router<AppState> {
    Router::new()
        .merge(presence::routes())
        .merge(broadcast::routes(broadcast_limit))
}

//! Application builder.

use axum::Router;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application.
pub fn build_app(state: AppState) -> Router {
    info!(
        bus = state.realtime.bus_name(),
        origins = ?state.config.server.cors.allowed_origins,
        "Building HTTP application"
    );
    build_router(state)
}

//! Route definitions.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::cors::build_cors_layer;
use crate::state::AppState;

/// Builds the router: `/ws` at the root and JSON endpoints under `/api`.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new().merge(health_routes());
    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_upgrade));
    let cors = build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .fallback(handlers::health::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}

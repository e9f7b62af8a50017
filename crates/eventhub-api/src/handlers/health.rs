//! Health check handlers.

use axum::Json;
use axum::extract::State;

use eventhub_core::error::AppError;

use crate::dto::{ApiResponse, DetailedHealthResponse, HealthResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    }))
}

/// GET /api/health/detailed
///
/// Reports 503 once the engine has begun shutting down or lost its bus subscription.
pub async fn health_detailed(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DetailedHealthResponse>>, ApiError> {
    let engine = &state.realtime;
    if engine.shutdown_token().is_cancelled() {
        return Err(AppError::service_unavailable("Gateway is shutting down").into());
    }
    if engine.bus_lost_token().is_cancelled() {
        return Err(AppError::service_unavailable("Bus subscription lost").into());
    }

    Ok(Json(ApiResponse::ok(DetailedHealthResponse {
        status: "ok".to_string(),
        bus: engine.bus_name().to_string(),
        ws_connections: engine.connections.connection_count(),
        online_users: engine.connections.online_count(),
        rooms: engine.connections.rooms().room_count(),
        metrics: engine.metrics.snapshot(),
    })))
}

/// Fallback for unknown paths.
pub async fn not_found() -> ApiError {
    AppError::not_found("Route not found").into()
}

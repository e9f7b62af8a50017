//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Instant;

use eventhub_core::config::AppConfig;
use eventhub_realtime::server::RealtimeEngine;

/// Shared dependencies, passed to every handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Real-time engine owning every socket registry
    pub realtime: RealtimeEngine,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Creates the state. The engine should already be started.
    pub fn new(config: Arc<AppConfig>, realtime: RealtimeEngine) -> Self {
        Self {
            config,
            realtime,
            started_at: Instant::now(),
        }
    }

    /// Seconds since the state was created.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

//! Pub/sub bus configuration.

use serde::{Deserialize, Serialize};

/// Message bus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Bus provider: `"redis"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Redis connection URL (credentials are treated as opaque).
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Channel carrying targeted notifications.
    #[serde(default = "default_notifications_channel")]
    pub notifications_channel: String,
    /// Channel carrying admin-only messages.
    #[serde(default = "default_admin_channel")]
    pub admin_channel: String,
    /// Per-channel buffer size for the in-memory provider.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            redis_url: default_redis_url(),
            notifications_channel: default_notifications_channel(),
            admin_channel: default_admin_channel(),
            buffer_size: default_buffer_size(),
        }
    }
}

fn default_provider() -> String {
    "redis".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_notifications_channel() -> String {
    "notifications".to_string()
}

fn default_admin_channel() -> String {
    "admin".to_string()
}

fn default_buffer_size() -> usize {
    1024
}

//! Real-time gateway configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound frame buffer per connection.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Interval between global admin statistics pushes, in seconds.
    #[serde(default = "default_stats_interval")]
    pub admin_stats_interval_seconds: u64,
    /// Interval between per-socket organizer statistics pushes, in seconds.
    #[serde(default = "default_stats_interval")]
    pub organizer_stats_interval_seconds: u64,
    /// Skip the admin statistics computation while no admin is connected.
    #[serde(default)]
    pub skip_admin_stats_when_idle: bool,
    /// Maximum accepted inbound frame size in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            admin_stats_interval_seconds: default_stats_interval(),
            organizer_stats_interval_seconds: default_stats_interval(),
            skip_admin_stats_when_idle: false,
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

impl RealtimeConfig {
    /// Admin statistics period.
    pub fn admin_stats_interval(&self) -> Duration {
        Duration::from_secs(self.admin_stats_interval_seconds.max(1))
    }

    /// Organizer statistics period.
    pub fn organizer_stats_interval(&self) -> Duration {
        Duration::from_secs(self.organizer_stats_interval_seconds.max(1))
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_stats_interval() -> u64 {
    15
}

fn default_max_message_bytes() -> usize {
    16_384
}

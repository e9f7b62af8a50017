//! Bus manager that dispatches to the configured provider.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use futures::StreamExt;
use tracing::info;

use eventhub_core::config::BusConfig;
use eventhub_core::error::AppError;
use eventhub_core::result::AppResult;
use eventhub_core::traits::bus::{BusStream, MessageBus};

/// Bus manager that wraps the configured bus provider.
///
/// The provider is selected at construction time based on configuration.
/// The manager also guarantees a single live subscription per channel in
/// this process; the slot is released when the returned stream is dropped.
#[derive(Debug, Clone)]
pub struct BusManager {
    /// The inner bus provider.
    inner: Arc<dyn MessageBus>,
    /// Channels with a live subscription.
    subscribed: Arc<DashSet<String>>,
}

impl BusManager {
    /// Create a new bus manager from configuration.
    pub async fn new(config: &BusConfig) -> AppResult<Self> {
        let inner: Arc<dyn MessageBus> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis bus provider");
                let client = crate::redis::RedisBusClient::connect(&config.redis_url).await?;
                Arc::new(crate::redis::RedisMessageBus::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory bus provider");
                Arc::new(crate::memory::MemoryMessageBus::new(config.buffer_size))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown bus provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self::from_provider(inner))
    }

    /// Create a bus manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn MessageBus>) -> Self {
        Self {
            inner: provider,
            subscribed: Arc::new(DashSet::new()),
        }
    }

    /// Get a shared handle to the inner provider.
    pub fn provider(&self) -> Arc<dyn MessageBus> {
        Arc::clone(&self.inner)
    }

    /// Whether a channel currently has a live subscription in this process.
    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.subscribed.contains(channel)
    }
}

/// Releases channel slots when a subscription stream is dropped.
struct SubscriptionGuard {
    channels: Vec<String>,
    registry: Arc<DashSet<String>>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        for channel in &self.channels {
            self.registry.remove(channel);
        }
    }
}

#[async_trait]
impl MessageBus for BusManager {
    async fn publish(&self, channel: &str, payload: &str) -> AppResult<()> {
        self.inner.publish(channel, payload).await
    }

    async fn subscribe(&self, channels: &[&str]) -> AppResult<BusStream> {
        let mut claimed = Vec::with_capacity(channels.len());
        for channel in channels {
            if !self.subscribed.insert((*channel).to_string()) {
                for name in &claimed {
                    self.subscribed.remove(name);
                }
                return Err(AppError::conflict(format!(
                    "Channel '{channel}' already has a subscriber in this process"
                )));
            }
            claimed.push((*channel).to_string());
        }

        let guard = SubscriptionGuard {
            channels: claimed,
            registry: Arc::clone(&self.subscribed),
        };

        // Constructed before the await so a failed subscribe releases the slots.
        let stream = self.inner.subscribe(channels).await?;
        info!(channels = ?channels, provider = self.inner.name(), "Subscribed to bus channels");

        Ok(stream
            .map(move |delivery| {
                let _held = &guard;
                delivery
            })
            .boxed())
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

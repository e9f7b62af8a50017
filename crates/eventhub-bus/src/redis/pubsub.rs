//! Redis pub/sub backend for multi-node deployments.

use async_trait::async_trait;
use futures::StreamExt;
use redis::AsyncCommands;
use tracing::{debug, warn};

use eventhub_core::error::{AppError, ErrorKind};
use eventhub_core::events::BusDelivery;
use eventhub_core::result::AppResult;
use eventhub_core::traits::bus::{BusStream, MessageBus};

use super::client::RedisBusClient;

/// Message bus backed by Redis `PUBLISH`/`SUBSCRIBE`.
#[derive(Debug, Clone)]
pub struct RedisMessageBus {
    client: RedisBusClient,
}

impl RedisMessageBus {
    /// Wrap a connected client.
    pub fn new(client: RedisBusClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageBus for RedisMessageBus {
    async fn publish(&self, channel: &str, payload: &str) -> AppResult<()> {
        let mut conn = self.client.conn_mut();
        let receivers: i64 = conn.publish(channel, payload).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::BusUnavailable,
                format!("Redis PUBLISH to '{channel}' failed"),
                e,
            )
        })?;
        debug!(channel, receivers, "Published bus message");
        Ok(())
    }

    async fn subscribe(&self, channels: &[&str]) -> AppResult<BusStream> {
        let mut pubsub = self.client.pubsub().await?;
        for channel in channels {
            pubsub.subscribe(*channel).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::BusUnavailable,
                    format!("Redis SUBSCRIBE to '{channel}' failed"),
                    e,
                )
            })?;
        }

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let channel = msg.get_channel_name().to_string();
            match msg.get_payload::<String>() {
                Ok(raw) => Some(BusDelivery::decode(channel, raw)),
                Err(e) => {
                    warn!(channel = %channel, error = %e, "Dropping non-string bus payload");
                    None
                }
            }
        });

        Ok(stream.boxed())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

//! In-process pub/sub for single-node deployments and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use eventhub_core::events::BusDelivery;
use eventhub_core::result::AppResult;
use eventhub_core::traits::bus::{BusStream, MessageBus};

/// In-memory pub/sub implementation over tokio broadcast channels.
#[derive(Debug)]
pub struct MemoryMessageBus {
    /// Channel name → broadcast sender
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
    /// Buffer size for channels
    buffer_size: usize,
}

impl MemoryMessageBus {
    /// Create a new in-memory bus
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Number of live receivers on a channel
    pub async fn receiver_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .await
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for MemoryMessageBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl MessageBus for MemoryMessageBus {
    async fn publish(&self, channel: &str, payload: &str) -> AppResult<()> {
        let channels = self.channels.read().await;
        match channels.get(channel) {
            // No receivers is not an error: the message is simply lost.
            Some(tx) => {
                let receivers = tx.send(payload.to_string()).unwrap_or(0);
                debug!(channel, receivers, "Published bus message");
            }
            None => debug!(channel, "Published to channel with no subscribers"),
        }
        Ok(())
    }

    async fn subscribe(&self, channels: &[&str]) -> AppResult<BusStream> {
        let mut registry = self.channels.write().await;
        let streams: Vec<BusStream> = channels
            .iter()
            .map(|name| {
                let rx = registry
                    .entry((*name).to_string())
                    .or_insert_with(|| broadcast::channel(self.buffer_size).0)
                    .subscribe();
                receiver_stream((*name).to_string(), rx)
            })
            .collect();

        Ok(Box::pin(stream::select_all(streams)))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Adapt a broadcast receiver into a delivery stream. Lagged messages are skipped.
fn receiver_stream(channel: String, rx: broadcast::Receiver<String>) -> BusStream {
    stream::unfold((channel, rx), |(channel, mut rx)| async move {
        loop {
            match rx.recv().await {
                Ok(raw) => {
                    let delivery = BusDelivery::decode(channel.clone(), raw);
                    return Some((delivery, (channel, rx)));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(channel = %channel, skipped, "Bus subscriber lagged, messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventhub_core::events::BusPayload;
    use serde_json::json;

    #[tokio::test]
    async fn test_every_subscriber_receives_every_message() {
        let bus = MemoryMessageBus::new(16);
        let mut first = bus.subscribe(&["notifications"]).await.unwrap();
        let mut second = bus.subscribe(&["notifications"]).await.unwrap();

        bus.publish("notifications", "{\"event\":\"x\"}").await.unwrap();

        for stream in [&mut first, &mut second] {
            let delivery = stream.next().await.unwrap();
            assert_eq!(delivery.channel, "notifications");
            assert_eq!(delivery.payload, BusPayload::Json(json!({"event": "x"})));
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_lost() {
        let bus = MemoryMessageBus::new(16);
        bus.publish("admin", "early").await.unwrap();

        let mut stream = bus.subscribe(&["admin"]).await.unwrap();
        bus.publish("admin", "late").await.unwrap();

        let delivery = stream.next().await.unwrap();
        assert_eq!(delivery.payload, BusPayload::Raw("late".to_string()));
    }

    #[tokio::test]
    async fn test_multi_channel_subscription_tags_channel() {
        let bus = MemoryMessageBus::new(16);
        let mut stream = bus.subscribe(&["notifications", "admin"]).await.unwrap();

        bus.publish_json("admin", &json!({"event": "a"})).await.unwrap();
        let delivery = stream.next().await.unwrap();
        assert_eq!(delivery.channel, "admin");
    }

    #[tokio::test]
    async fn test_publish_json_sends_strings_verbatim() {
        let bus = MemoryMessageBus::new(16);
        let mut stream = bus.subscribe(&["admin"]).await.unwrap();

        bus.publish_json("admin", &json!("plain text")).await.unwrap();
        let delivery = stream.next().await.unwrap();
        assert_eq!(delivery.payload, BusPayload::Raw("plain text".to_string()));
    }

    #[tokio::test]
    async fn test_dropping_stream_releases_receiver() {
        let bus = MemoryMessageBus::new(16);
        let stream = bus.subscribe(&["notifications"]).await.unwrap();
        assert_eq!(bus.receiver_count("notifications").await, 1);
        drop(stream);
        assert_eq!(bus.receiver_count("notifications").await, 0);
    }
}

//! Publish/subscribe bus trait for pluggable backends.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;

use crate::events::BusDelivery;
use crate::result::AppResult;

/// Stream of decoded deliveries from a subscription.
///
/// Dropping the stream ends the subscription.
pub type BusStream = Pin<Box<dyn Stream<Item = BusDelivery> + Send>>;

/// Trait for bus backends (Redis pub/sub or in-process broadcast).
///
/// Delivery is fan-out and at-most-once: every live subscriber of a channel
/// receives each message, and messages published while nobody listens are
/// lost.
#[async_trait]
pub trait MessageBus: Send + Sync + std::fmt::Debug + 'static {
    /// Publish a string payload to a channel.
    ///
    /// Fails fast with a `BusUnavailable` error when the backend cannot be
    /// reached; nothing is buffered for retry.
    async fn publish(&self, channel: &str, payload: &str) -> AppResult<()>;

    /// Publish a JSON value. String values are sent verbatim, anything else
    /// is serialized first.
    async fn publish_json(&self, channel: &str, payload: &Value) -> AppResult<()> {
        match payload {
            Value::String(raw) => self.publish(channel, raw).await,
            other => {
                let encoded = serde_json::to_string(other)?;
                self.publish(channel, &encoded).await
            }
        }
    }

    /// Subscribe to the given channels.
    async fn subscribe(&self, channels: &[&str]) -> AppResult<BusStream>;

    /// Backend name for logs and health output.
    fn name(&self) -> &'static str;
}

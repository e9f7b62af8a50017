//! Producer-side helper for announcing domain events onto the bus.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use eventhub_core::events::{AdminBusMessage, BusChannels, BusMessage, BusTarget};
use eventhub_core::result::AppResult;
use eventhub_core::traits::bus::MessageBus;
use eventhub_core::types::{EventId, UserId, UserRole};

/// Publishes envelopes onto the notifications and admin channels.
///
/// Every call stamps `data.timestamp` before publishing. Bus failures are
/// returned to the caller unchanged; nothing is retried.
#[derive(Debug, Clone)]
pub struct PublisherFacade {
    bus: Arc<dyn MessageBus>,
    channels: BusChannels,
}

impl PublisherFacade {
    /// Create a publisher over a bus provider.
    pub fn new(bus: Arc<dyn MessageBus>, channels: BusChannels) -> Self {
        Self { bus, channels }
    }

    /// Broadcast to every connected socket.
    pub async fn publish_to_all(&self, event: &str, data: Value) -> AppResult<()> {
        self.publish_targeted(BusTarget::All, event, data).await
    }

    /// Broadcast to every socket of users holding `role`.
    pub async fn publish_to_role(&self, role: UserRole, event: &str, data: Value) -> AppResult<()> {
        self.publish_targeted(BusTarget::Role { role }, event, data)
            .await
    }

    /// Send to every socket of one user.
    pub async fn publish_to_user(&self, user_id: UserId, event: &str, data: Value) -> AppResult<()> {
        self.publish_targeted(BusTarget::User { user_id }, event, data)
            .await
    }

    /// Send to every socket that joined the event's room.
    pub async fn publish_to_event(
        &self,
        event_id: EventId,
        event: &str,
        data: Value,
    ) -> AppResult<()> {
        self.publish_targeted(BusTarget::Event { event_id }, event, data)
            .await
    }

    /// Publish on the admin channel. No target is attached.
    pub async fn publish_admin(&self, event: &str, data: Value) -> AppResult<()> {
        let envelope = AdminBusMessage {
            event: event.to_string(),
            data: stamp(data),
        };
        self.send(&self.channels.admin, &envelope).await
    }

    async fn publish_targeted(&self, target: BusTarget, event: &str, data: Value) -> AppResult<()> {
        let envelope = BusMessage {
            event: event.to_string(),
            data: stamp(data),
            target,
        };
        self.send(&self.channels.notifications, &envelope).await
    }

    async fn send<T: Serialize>(&self, channel: &str, envelope: &T) -> AppResult<()> {
        let payload = serde_json::to_string(envelope)?;
        self.bus.publish(channel, &payload).await?;
        debug!(channel, "Envelope published");
        Ok(())
    }
}

/// Add a `timestamp` field; non-object data becomes `{value, timestamp}`.
fn stamp(data: Value) -> Value {
    let now = Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
    let mut object = match data {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    object.insert("timestamp".to_string(), now);
    Value::Object(object)
}

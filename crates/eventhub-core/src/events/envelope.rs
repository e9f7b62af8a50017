//! Bus channel envelopes and delivery decoding.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::BusConfig;
use crate::types::{EventId, UserId, UserRole};

/// Names of the two broadcast channels the gateway listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusChannels {
    /// Targeted notifications (`{event, data, target}`).
    pub notifications: String,
    /// Admin-only messages (`{event, data}`).
    pub admin: String,
}

impl BusChannels {
    /// Channel names from configuration.
    pub fn from_config(config: &BusConfig) -> Self {
        Self {
            notifications: config.notifications_channel.clone(),
            admin: config.admin_channel.clone(),
        }
    }

    /// Both channel names, notifications first.
    pub fn all(&self) -> [&str; 2] {
        [self.notifications.as_str(), self.admin.as_str()]
    }
}

impl Default for BusChannels {
    fn default() -> Self {
        Self::from_config(&BusConfig::default())
    }
}

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BusTarget {
    /// Every connected socket.
    All,
    /// Every socket of one user.
    User {
        /// Recipient user.
        #[serde(rename = "userId", deserialize_with = "lenient_id")]
        user_id: UserId,
    },
    /// Every socket whose user holds the role.
    Role {
        /// Recipient role.
        role: UserRole,
    },
    /// Every socket that joined the event's room.
    Event {
        /// Event whose room receives the message.
        #[serde(rename = "eventId", deserialize_with = "lenient_id")]
        event_id: EventId,
    },
}

/// Envelope on the notifications channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    /// Client-facing event name, relayed verbatim.
    pub event: String,
    /// Producer-supplied payload, relayed verbatim.
    #[serde(default)]
    pub data: Value,
    /// Routing discriminator.
    pub target: BusTarget,
}

/// Envelope on the admin channel; always addressed to `role_ADMIN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminBusMessage {
    /// Client-facing event name, relayed verbatim.
    pub event: String,
    /// Producer-supplied payload, relayed verbatim.
    #[serde(default)]
    pub data: Value,
}

/// A bus payload after the decode attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum BusPayload {
    /// The payload parsed as JSON.
    Json(Value),
    /// The payload was not JSON and is kept as received.
    Raw(String),
}

impl BusPayload {
    /// Attempt a JSON decode, falling back to the raw string.
    pub fn decode(raw: String) -> Self {
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Raw(raw),
        }
    }
}

/// One message received from a subscribed channel.
#[derive(Debug, Clone, PartialEq)]
pub struct BusDelivery {
    /// Channel the message arrived on.
    pub channel: String,
    /// Decoded payload.
    pub payload: BusPayload,
}

impl BusDelivery {
    /// Build a delivery from a raw channel message.
    pub fn decode(channel: impl Into<String>, raw: String) -> Self {
        Self {
            channel: channel.into(),
            payload: BusPayload::decode(raw),
        }
    }
}

/// Accept ids sent either as JSON numbers or numeric strings.
fn lenient_id<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<i64>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(i64),
        Str(String),
    }

    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => Ok(T::from(n)),
        NumOrStr::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(T::from)
            .map_err(serde::de::Error::custom),
    }
}

//! Notification dispatcher: routes bus deliveries to rooms.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use eventhub_core::events::{AdminBusMessage, BusChannels, BusDelivery, BusMessage, BusPayload, BusTarget};
use eventhub_core::traits::bus::BusStream;

use crate::connection::manager::ConnectionManager;
use crate::message::types::relay_frame;
use crate::metrics::RealtimeMetrics;
use crate::room::Room;

/// Where a decoded bus message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Destination {
    Everyone,
    Room(Room),
}

impl From<BusTarget> for Destination {
    fn from(target: BusTarget) -> Self {
        match target {
            BusTarget::All => Self::Everyone,
            BusTarget::User { user_id } => Self::Room(Room::User(user_id)),
            BusTarget::Role { role } => Self::Room(Room::Role(role)),
            BusTarget::Event { event_id } => Self::Room(Room::Event(event_id)),
        }
    }
}

/// Consumes the bus subscription and emits each message to its recipients.
///
/// Malformed messages are dropped; delivery is best effort.
#[derive(Debug)]
pub struct NotificationDispatcher {
    /// Connection manager for emitting frames
    connections: Arc<ConnectionManager>,
    /// Subscribed channel names
    channels: BusChannels,
    /// Metrics
    metrics: Arc<RealtimeMetrics>,
}

impl NotificationDispatcher {
    /// Create a new dispatcher
    pub fn new(
        connections: Arc<ConnectionManager>,
        channels: BusChannels,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            connections,
            channels,
            metrics,
        }
    }

    /// Spawn the consumer loop. It runs until `shutdown` fires or the stream ends.
    ///
    /// An ended stream means the subscription is gone for good, so `lost` is
    /// cancelled for the owner to tear the gateway down.
    pub fn spawn(
        self: &Arc<Self>,
        mut stream: BusStream,
        shutdown: CancellationToken,
        lost: CancellationToken,
    ) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            info!(
                notifications = %this.channels.notifications,
                admin = %this.channels.admin,
                "Notification dispatcher started"
            );
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    next = stream.next() => match next {
                        Some(delivery) => {
                            this.dispatch(delivery);
                        }
                        None => {
                            error!("Bus subscription ended, stopping the gateway");
                            lost.cancel();
                            break;
                        }
                    },
                }
            }
            info!("Notification dispatcher stopped");
        })
    }

    /// Route one delivery. Returns the number of sockets that received it.
    pub fn dispatch(&self, delivery: BusDelivery) -> usize {
        let value = match delivery.payload {
            BusPayload::Json(value) => value,
            BusPayload::Raw(_) => return self.drop_message(&delivery.channel, "payload is not JSON"),
        };

        let routed = if delivery.channel == self.channels.notifications {
            self.decode_notification(value)
        } else if delivery.channel == self.channels.admin {
            self.decode_admin(value)
        } else {
            warn!(channel = %delivery.channel, "Delivery from unexpected channel");
            None
        };

        let Some((destination, event, data)) = routed else {
            return self.drop_message(&delivery.channel, "envelope rejected");
        };
        let Some(frame) = relay_frame(&event, &data) else {
            return self.drop_message(&delivery.channel, "encoding failed");
        };

        let sent = match destination {
            Destination::Everyone => self.connections.emit_to_all(&frame),
            Destination::Room(room) => self.connections.emit_to_room(&room, &frame),
        };
        self.metrics.message_relayed();
        debug!(channel = %delivery.channel, event = %event, sent, "Relayed bus message");
        sent
    }

    fn decode_notification(&self, value: Value) -> Option<(Destination, String, Value)> {
        let message: BusMessage = serde_json::from_value(value)
            .map_err(|e| debug!(error = %e, "Invalid notification envelope"))
            .ok()?;
        if message.event.is_empty() {
            return None;
        }
        Some((message.target.into(), message.event, message.data))
    }

    fn decode_admin(&self, value: Value) -> Option<(Destination, String, Value)> {
        let message: AdminBusMessage = serde_json::from_value(value)
            .map_err(|e| debug!(error = %e, "Invalid admin envelope"))
            .ok()?;
        if message.event.is_empty() {
            return None;
        }
        Some((Destination::Room(Room::ADMINS), message.event, message.data))
    }

    fn drop_message(&self, channel: &str, reason: &str) -> usize {
        debug!(channel, reason, "Dropped bus message");
        self.metrics.message_dropped();
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventhub_bus::PublisherFacade;
    use eventhub_bus::memory::MemoryMessageBus;
    use eventhub_core::config::RealtimeConfig;
    use eventhub_core::traits::bus::MessageBus;
    use eventhub_core::types::{EventId, UserId, UserRole};
    use serde_json::json;
    use tokio::sync::mpsc;

    use crate::connection::authenticator::AuthenticatedConnection;
    use crate::connection::handle::ConnectionHandle;
    use crate::presence::tracker::PresenceTracker;
    use crate::room::RoomRegistry;

    struct Fixture {
        connections: Arc<ConnectionManager>,
        dispatcher: Arc<NotificationDispatcher>,
        metrics: Arc<RealtimeMetrics>,
    }

    fn fixture() -> Fixture {
        let metrics = Arc::new(RealtimeMetrics::new());
        let connections = Arc::new(ConnectionManager::new(
            &RealtimeConfig::default(),
            Arc::new(RoomRegistry::new()),
            Arc::new(PresenceTracker::new()),
            metrics.clone(),
        ));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            connections.clone(),
            BusChannels::default(),
            metrics.clone(),
        ));
        Fixture {
            connections,
            dispatcher,
            metrics,
        }
    }

    fn connect(
        fx: &Fixture,
        id: i64,
        role: UserRole,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (handle, mut rx) = fx.connections.register(AuthenticatedConnection {
            user_id: UserId::new(id),
            role,
            name: format!("user-{id}"),
        });
        while rx.try_recv().is_ok() {}
        (handle, rx)
    }

    fn received(rx: &mut mpsc::Receiver<String>) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(serde_json::from_str(&frame).unwrap());
        }
        frames
    }

    fn notification(value: Value) -> BusDelivery {
        BusDelivery::decode("notifications", value.to_string())
    }

    #[tokio::test]
    async fn test_user_target_reaches_only_that_user() {
        let fx = fixture();
        let (_tab1, mut rx1) = connect(&fx, 42, UserRole::User);
        let (_tab2, mut rx2) = connect(&fx, 42, UserRole::User);
        let (_other, mut other_rx) = connect(&fx, 43, UserRole::User);

        let sent = fx.dispatcher.dispatch(notification(json!({
            "event": "booking_confirmed",
            "data": {"bookingId": 9},
            "target": {"type": "user", "userId": 42}
        })));

        assert_eq!(sent, 2);
        let frames = received(&mut rx1);
        assert_eq!(
            frames,
            vec![json!({"event": "booking_confirmed", "data": {"bookingId": 9}})]
        );
        assert_eq!(received(&mut rx2).len(), 1);
        assert!(received(&mut other_rx).is_empty());
    }

    #[tokio::test]
    async fn test_role_and_all_targets() {
        let fx = fixture();
        let (_org, mut org_rx) = connect(&fx, 1, UserRole::Organizer);
        let (_user, mut user_rx) = connect(&fx, 2, UserRole::User);

        fx.dispatcher.dispatch(notification(json!({
            "event": "organizer_notice", "data": {}, "target": {"type": "role", "role": "ORGANIZER"}
        })));
        fx.dispatcher.dispatch(notification(json!({
            "event": "maintenance", "data": {}, "target": {"type": "all"}
        })));

        assert_eq!(received(&mut org_rx).len(), 2);
        let user_frames = received(&mut user_rx);
        assert_eq!(user_frames.len(), 1);
        assert_eq!(user_frames[0]["event"], "maintenance");
    }

    #[tokio::test]
    async fn test_admin_channel_ignores_target() {
        let fx = fixture();
        let (_admin, mut admin_rx) = connect(&fx, 1, UserRole::Admin);
        let (_user, mut user_rx) = connect(&fx, 2, UserRole::User);
        received(&mut admin_rx);

        let sent = fx.dispatcher.dispatch(BusDelivery::decode(
            "admin",
            json!({"event": "new_report", "data": {"id": 3}, "target": {"type": "all"}}).to_string(),
        ));

        assert_eq!(sent, 1);
        assert_eq!(received(&mut admin_rx)[0]["event"], "new_report");
        assert!(received(&mut user_rx).is_empty());
    }

    #[tokio::test]
    async fn test_malformed_messages_are_dropped() {
        let fx = fixture();
        let (_user, mut rx) = connect(&fx, 1, UserRole::User);

        let rejects = [
            BusDelivery::decode("notifications", "plain text".to_string()),
            notification(json!({"event": "x", "data": {}})),
            notification(json!({"event": "x", "data": {}, "target": {"type": "galaxy"}})),
            notification(json!({"event": "x", "data": {}, "target": {"type": "role", "role": "ROOT"}})),
            notification(json!({"event": "", "data": {}, "target": {"type": "all"}})),
            BusDelivery::decode("elsewhere", json!({"event": "x"}).to_string()),
        ];
        for delivery in rejects {
            assert_eq!(fx.dispatcher.dispatch(delivery), 0);
        }

        assert!(received(&mut rx).is_empty());
        assert_eq!(fx.metrics.snapshot().messages_dropped, 6);
    }

    #[tokio::test]
    async fn test_event_room_fan_out_through_bus() {
        let fx = fixture();
        let bus = Arc::new(MemoryMessageBus::new(16));
        let shutdown = CancellationToken::new();
        let stream = bus.subscribe(&BusChannels::default().all()).await.unwrap();
        let task = fx
            .dispatcher
            .spawn(stream, shutdown.clone(), CancellationToken::new());

        let (a, mut a_rx) = connect(&fx, 1, UserRole::User);
        let (b, mut b_rx) = connect(&fx, 2, UserRole::User);
        let (_c, mut c_rx) = connect(&fx, 3, UserRole::User);
        fx.connections.join_room(a.id, Room::Event(EventId::new(7)));
        fx.connections.join_room(b.id, Room::Event(EventId::new(7)));

        PublisherFacade::new(bus.clone(), BusChannels::default())
            .publish_to_event(EventId::new(7), "event_updated", json!({"title": "X"}))
            .await
            .unwrap();

        let frame = a_rx.recv().await.unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["event"], "event_updated");
        assert_eq!(value["data"]["title"], "X");
        assert!(value["data"]["timestamp"].is_string());
        assert!(b_rx.recv().await.is_some());

        shutdown.cancel();
        task.await.unwrap();
        assert!(received(&mut c_rx).is_empty());
    }

    #[tokio::test]
    async fn test_ended_stream_signals_lost_subscription() {
        let fx = fixture();
        let shutdown = CancellationToken::new();
        let lost = CancellationToken::new();
        let deliveries = vec![notification(json!({
            "event": "last_words",
            "data": {},
            "target": {"type": "all"}
        }))];
        let (_user, mut rx) = connect(&fx, 1, UserRole::User);

        let task = fx.dispatcher.spawn(
            futures::stream::iter(deliveries).boxed(),
            shutdown.clone(),
            lost.clone(),
        );
        task.await.unwrap();

        assert!(lost.is_cancelled());
        assert!(!shutdown.is_cancelled());
        assert_eq!(received(&mut rx)[0]["event"], "last_words");
    }

    #[tokio::test]
    async fn test_shutdown_does_not_signal_lost_subscription() {
        let fx = fixture();
        let shutdown = CancellationToken::new();
        let lost = CancellationToken::new();

        let task = fx.dispatcher.spawn(
            futures::stream::pending::<BusDelivery>().boxed(),
            shutdown.clone(),
            lost.clone(),
        );
        shutdown.cancel();
        task.await.unwrap();

        assert!(!lost.is_cancelled());
    }
}

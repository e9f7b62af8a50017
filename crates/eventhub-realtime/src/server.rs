//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use eventhub_auth::jwt::JwtDecoder;
use eventhub_core::config::{AuthConfig, RealtimeConfig};
use eventhub_core::events::BusChannels;
use eventhub_core::result::AppResult;
use eventhub_core::traits::{MessageBus, StatsProvider};

use crate::connection::authenticator::{AuthenticatedConnection, SocketAuthenticator};
use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::connection::manager::ConnectionManager;
use crate::message::types::{ClientEvent, ServerEvent};
use crate::message::validator::validate_inbound;
use crate::metrics::RealtimeMetrics;
use crate::notification::dispatcher::NotificationDispatcher;
use crate::presence::tracker::PresenceTracker;
use crate::room::{Room, RoomRegistry};
use crate::stats::broadcaster::StatsBroadcaster;

/// Composition root of the gateway: owns every registry and background task.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Handshake authenticator.
    pub authenticator: SocketAuthenticator,
    /// Statistics broadcaster.
    pub stats: Arc<StatsBroadcaster>,
    /// Bus-to-room dispatcher.
    pub dispatcher: Arc<NotificationDispatcher>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    bus: Arc<dyn MessageBus>,
    channels: BusChannels,
    max_message_bytes: usize,
    shutdown: CancellationToken,
    bus_lost: CancellationToken,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("bus", &self.bus.name())
            .field("connections", &self.connections.connection_count())
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates a new engine. Nothing runs until [`RealtimeEngine::start`].
    pub fn new(
        config: &RealtimeConfig,
        auth: &AuthConfig,
        bus: Arc<dyn MessageBus>,
        channels: BusChannels,
        stats_provider: Arc<dyn StatsProvider>,
    ) -> Self {
        let metrics = Arc::new(RealtimeMetrics::new());
        let connections = Arc::new(ConnectionManager::new(
            config,
            Arc::new(RoomRegistry::new()),
            Arc::new(PresenceTracker::new()),
            metrics.clone(),
        ));
        let authenticator = SocketAuthenticator::new(Arc::new(JwtDecoder::new(auth)));
        let stats = Arc::new(StatsBroadcaster::new(
            config,
            stats_provider,
            connections.clone(),
            metrics.clone(),
        ));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            connections.clone(),
            channels.clone(),
            metrics.clone(),
        ));

        info!(bus = bus.name(), "Real-time engine initialized");

        Self {
            connections,
            authenticator,
            stats,
            dispatcher,
            metrics,
            bus,
            channels,
            max_message_bytes: config.max_message_bytes,
            shutdown: CancellationToken::new(),
            bus_lost: CancellationToken::new(),
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Subscribes to the bus and starts the background loops.
    ///
    /// A failed subscription is returned to the caller; the gateway should
    /// not serve sockets without it.
    pub async fn start(&self) -> AppResult<()> {
        let stream = self.bus.subscribe(&self.channels.all()).await?;

        let mut tasks = self.tasks.lock().await;
        tasks.push(self.dispatcher.spawn(
            stream,
            self.shutdown.child_token(),
            self.bus_lost.clone(),
        ));
        tasks.push(self.stats.spawn_admin_loop(self.shutdown.child_token()));

        info!(
            notifications = %self.channels.notifications,
            admin = %self.channels.admin,
            "Real-time engine started"
        );
        Ok(())
    }

    /// Verifies a handshake token.
    pub fn authenticate(&self, token: Option<&str>) -> AppResult<AuthenticatedConnection> {
        self.authenticator.authenticate(token).inspect_err(|e| {
            self.metrics.auth_failed();
            debug!(error = %e, "Handshake rejected");
        })
    }

    /// Registers an authenticated socket.
    pub fn register(
        &self,
        auth: AuthenticatedConnection,
    ) -> (Arc<ConnectionHandle>, tokio::sync::mpsc::Receiver<String>) {
        self.connections.register(auth)
    }

    /// Tears down a socket.
    pub async fn unregister(&self, conn_id: &ConnectionId) {
        self.connections.unregister(conn_id).await;
    }

    /// Handles one inbound text frame from a registered socket.
    pub async fn handle_inbound(&self, handle: &Arc<ConnectionHandle>, raw: &str) {
        self.metrics.frame_received();

        let event = match validate_inbound(raw, self.max_message_bytes)
            .and_then(|_| ClientEvent::parse(raw))
        {
            Ok(event) => event,
            Err(e) => {
                self.metrics.frame_rejected();
                warn!(conn_id = %handle.id, error = %e, "Rejected inbound frame");
                handle.send_event(&ServerEvent::error(e.message));
                return;
            }
        };

        debug!(conn_id = %handle.id, event = event.name(), "Inbound event");
        match event {
            ClientEvent::JoinEventRoom(event_id) => {
                self.connections.join_room(handle.id, Room::Event(event_id));
            }
            ClientEvent::LeaveEventRoom(event_id) => {
                self.connections.leave_room(handle.id, Room::Event(event_id));
            }
            ClientEvent::RequestAdminStats => self.stats.handle_admin_request(handle).await,
            ClientEvent::RequestOrganizerStats => self.stats.handle_organizer_request(handle).await,
            ClientEvent::Ping => {
                handle.send_event(&ServerEvent::pong());
            }
        }
    }

    /// Token cancelled when the engine shuts down. Socket tasks select on it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Token cancelled when the bus subscription ends. The process should
    /// shut down once it fires.
    pub fn bus_lost_token(&self) -> CancellationToken {
        self.bus_lost.clone()
    }

    /// Name of the bus backend.
    pub fn bus_name(&self) -> &'static str {
        self.bus.name()
    }

    /// Stops background loops and closes every socket.
    pub async fn shutdown(&self) -> AppResult<()> {
        info!("Shutting down real-time engine");
        self.shutdown.cancel();

        let tasks: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }

        self.connections.close_all().await;
        info!("Real-time engine shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use eventhub_auth::jwt::JwtEncoder;
    use eventhub_bus::memory::MemoryMessageBus;
    use eventhub_bus::{BusManager, PublisherFacade};
    use eventhub_core::error::ErrorKind;
    use eventhub_core::events::BusDelivery;
    use eventhub_core::traits::bus::BusStream;
    use eventhub_core::types::{AdminStats, EventId, OrganizerStats, UserId, UserRole};
    use serde_json::{Value, json};
    use tokio::sync::mpsc;

    #[derive(Debug)]
    struct ZeroStats;

    #[async_trait]
    impl StatsProvider for ZeroStats {
        async fn admin_stats(&self) -> AppResult<AdminStats> {
            Ok(AdminStats::default())
        }

        async fn organizer_stats(&self, _organizer: UserId) -> AppResult<OrganizerStats> {
            Ok(OrganizerStats::default())
        }
    }

    /// A bus whose subscriptions end immediately.
    #[derive(Debug)]
    struct ClosedBus;

    #[async_trait]
    impl MessageBus for ClosedBus {
        async fn publish(&self, _channel: &str, _payload: &str) -> AppResult<()> {
            Ok(())
        }

        async fn subscribe(&self, _channels: &[&str]) -> AppResult<BusStream> {
            Ok(Box::pin(futures::stream::empty::<BusDelivery>()))
        }

        fn name(&self) -> &'static str {
            "closed"
        }
    }

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "engine-secret".into(),
            jwt_access_ttl_minutes: 15,
            leeway_seconds: 0,
            access_cookie_name: "accessToken".into(),
        }
    }

    fn engine(bus: Arc<dyn MessageBus>) -> RealtimeEngine {
        RealtimeEngine::new(
            &RealtimeConfig::default(),
            &auth_config(),
            bus,
            BusChannels::default(),
            Arc::new(ZeroStats),
        )
    }

    fn connect(engine: &RealtimeEngine, id: i64, role: UserRole) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (token, _) = JwtEncoder::new(&auth_config())
            .generate_access_token(UserId::new(id), role, "tester")
            .unwrap();
        let identity = engine.authenticate(Some(&token)).unwrap();
        let (handle, mut rx) = engine.register(identity);
        while rx.try_recv().is_ok() {}
        (handle, rx)
    }

    async fn next_frame(rx: &mut mpsc::Receiver<String>) -> Value {
        serde_json::from_str(&rx.recv().await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_ping_and_bad_frames() {
        let engine = engine(Arc::new(MemoryMessageBus::default()));
        let (handle, mut rx) = connect(&engine, 1, UserRole::User);

        engine.handle_inbound(&handle, r#"{"event":"ping"}"#).await;
        let pong = next_frame(&mut rx).await;
        assert_eq!(pong["event"], "pong");
        assert!(pong["data"]["timestamp"].is_i64());

        engine.handle_inbound(&handle, "{oops").await;
        assert_eq!(next_frame(&mut rx).await["event"], "error");

        let oversized = format!(r#"{{"event":"ping","data":"{}"}}"#, "x".repeat(20_000));
        engine.handle_inbound(&handle, &oversized).await;
        assert_eq!(next_frame(&mut rx).await["event"], "error");
        assert!(handle.is_alive());
    }

    #[tokio::test]
    async fn test_event_room_join_leave_and_relay() {
        let bus: Arc<dyn MessageBus> = Arc::new(MemoryMessageBus::default());
        let engine = engine(bus.clone());
        engine.start().await.unwrap();

        let (handle, mut rx) = connect(&engine, 5, UserRole::User);
        engine
            .handle_inbound(&handle, r#"{"event":"join_event_room","data":{"eventId":7}}"#)
            .await;

        let publisher = PublisherFacade::new(bus, BusChannels::default());
        publisher
            .publish_to_event(EventId::new(7), "event_updated", json!({"title": "X"}))
            .await
            .unwrap();
        assert_eq!(next_frame(&mut rx).await["event"], "event_updated");

        engine
            .handle_inbound(&handle, r#"{"event":"leave_event_room","data":7}"#)
            .await;
        publisher
            .publish_to_event(EventId::new(7), "event_updated", json!({}))
            .await
            .unwrap();
        publisher
            .publish_to_user(UserId::new(5), "marker", json!({}))
            .await
            .unwrap();
        assert_eq!(next_frame(&mut rx).await["event"], "marker");

        engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_fails_when_channels_taken() {
        let manager = BusManager::from_provider(Arc::new(MemoryMessageBus::default()));
        let _held = manager.subscribe(&["notifications"]).await.unwrap();

        let engine = engine(Arc::new(manager));
        let err = engine.start().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_ended_subscription_cancels_bus_lost_token() {
        let engine = engine(Arc::new(ClosedBus));
        engine.start().await.unwrap();

        let lost = engine.bus_lost_token();
        tokio::time::timeout(std::time::Duration::from_secs(5), lost.cancelled())
            .await
            .unwrap();
        assert!(!engine.shutdown_token().is_cancelled());

        engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_connections() {
        let engine = engine(Arc::new(MemoryMessageBus::default()));
        engine.start().await.unwrap();
        let (handle, _rx) = connect(&engine, 1, UserRole::Organizer);
        let token = engine.shutdown_token();

        engine.shutdown().await.unwrap();
        assert!(token.is_cancelled());
        assert!(!handle.is_alive());
        assert_eq!(engine.connections.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_handshake_is_counted() {
        let engine = engine(Arc::new(MemoryMessageBus::default()));
        assert!(engine.authenticate(Some("garbage")).is_err());
        assert!(engine.authenticate(None).is_err());
        assert_eq!(engine.metrics.snapshot().auth_failures, 2);
        assert_eq!(engine.connections.connection_count(), 0);
    }
}

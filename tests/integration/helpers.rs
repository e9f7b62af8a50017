//! Shared test helpers for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use eventhub_api::{AppState, build_app};
use eventhub_auth::JwtEncoder;
use eventhub_bus::memory::MemoryMessageBus;
use eventhub_bus::{BusManager, PublisherFacade};
use eventhub_core::config::{
    AppConfig, AuthConfig, BusConfig, DatabaseConfig, LoggingConfig, RealtimeConfig, ServerConfig,
};
use eventhub_core::events::BusChannels;
use eventhub_core::result::AppResult;
use eventhub_core::traits::StatsProvider;
use eventhub_core::types::{AdminStats, OrganizerStats, UserId, UserRole};
use eventhub_realtime::RealtimeEngine;

/// Client side of a test socket.
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Fixed statistics so assertions can check exact values.
#[derive(Debug)]
pub struct FixedStats;

#[async_trait]
impl StatsProvider for FixedStats {
    async fn admin_stats(&self) -> AppResult<AdminStats> {
        Ok(AdminStats {
            total_users: 120,
            total_events: 14,
            upcoming_events: 6,
            total_registrations: 300,
            pending_requests: 4,
        })
    }

    async fn organizer_stats(&self, organizer: UserId) -> AppResult<OrganizerStats> {
        Ok(OrganizerStats {
            total_events: organizer.get(),
            active_events: 1,
            total_registrations: 25,
            registrations_this_month: 5,
        })
    }
}

/// A gateway served on an ephemeral port with the in-memory bus.
pub struct TestApp {
    /// Bound address
    pub addr: SocketAddr,
    /// Engine behind the server
    pub engine: RealtimeEngine,
    /// Producer side of the bus
    pub publisher: PublisherFacade,
    /// Configuration the server runs with
    pub config: Arc<AppConfig>,
}

impl TestApp {
    /// Start a gateway on 127.0.0.1 with a random port.
    pub async fn spawn() -> Self {
        let config = Arc::new(test_config());
        let bus = Arc::new(MemoryMessageBus::default());
        let channels = BusChannels::from_config(&config.bus);

        let engine = RealtimeEngine::new(
            &config.realtime,
            &config.auth,
            Arc::new(BusManager::from_provider(bus.clone())),
            channels.clone(),
            Arc::new(FixedStats),
        );
        engine.start().await.expect("engine start");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let app = build_app(AppState::new(config.clone(), engine.clone()));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            addr,
            engine,
            publisher: PublisherFacade::new(bus, channels),
            config,
        }
    }

    /// Issue an access token with the configured lifetime.
    pub fn token(&self, id: i64, role: UserRole) -> String {
        JwtEncoder::new(&self.config.auth)
            .generate_access_token(UserId::new(id), role, &format!("user-{id}"))
            .expect("token")
            .0
    }

    /// Issue an access token with an explicit lifetime; negative means expired.
    pub fn token_with_ttl(&self, id: i64, role: UserRole, minutes: i64) -> String {
        JwtEncoder::new(&self.config.auth)
            .with_ttl_minutes(minutes)
            .generate_access_token(UserId::new(id), role, &format!("user-{id}"))
            .expect("token")
            .0
    }

    fn ws_url(&self, token: Option<&str>) -> String {
        match token {
            Some(token) => format!("ws://{}/ws?token={}", self.addr, token),
            None => format!("ws://{}/ws", self.addr),
        }
    }

    /// Open a socket, passing the token in the query string.
    pub async fn connect(&self, token: Option<&str>) -> WsClient {
        let (ws, _) = connect_async(self.ws_url(token)).await.expect("connect");
        ws
    }

    /// Open a socket, passing the token in the access cookie.
    pub async fn connect_with_cookie(&self, token: &str) -> WsClient {
        let mut request = self.ws_url(None).into_client_request().expect("request");
        let cookie = format!("{}={}", self.config.auth.access_cookie_name, token);
        request
            .headers_mut()
            .insert("Cookie", HeaderValue::from_str(&cookie).expect("cookie header"));
        let (ws, _) = connect_async(request).await.expect("connect");
        ws
    }

    /// Open an authenticated socket and wait until the server has registered it.
    pub async fn connect_as(&self, id: i64, role: UserRole) -> WsClient {
        let mut ws = self.connect(Some(&self.token(id, role))).await;
        if role == UserRole::Admin {
            // Admins are told the online count as soon as they register.
            let frame = next_json(&mut ws).await;
            assert_eq!(frame["event"], "dashboard_online_update");
        }
        ping(&mut ws).await;
        ws
    }

    /// Poll until `check` holds or the frame timeout elapses.
    pub async fn wait_until(&self, check: impl Fn(&RealtimeEngine) -> bool) {
        tokio::time::timeout(FRAME_TIMEOUT, async {
            while !check(&self.engine) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }
}

/// Send a JSON text frame.
pub async fn send_json(ws: &mut WsClient, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send");
}

/// Receive the next text frame as JSON.
pub async fn next_json(ws: &mut WsClient) -> Value {
    loop {
        let msg = tokio::time::timeout(FRAME_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("socket error");
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).expect("json frame"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Round-trip a ping. Frames on one socket are handled in order, so this
/// also waits for every earlier frame to be processed.
pub async fn ping(ws: &mut WsClient) {
    send_json(ws, serde_json::json!({"event": "ping"})).await;
    let pong = next_json(ws).await;
    assert_eq!(pong["event"], "pong", "expected pong, got {pong}");
}

fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "postgres://localhost/unused".into(),
            max_connections: 1,
            min_connections: 0,
            connect_timeout_seconds: 1,
            idle_timeout_seconds: 1,
        },
        bus: BusConfig {
            provider: "memory".into(),
            ..BusConfig::default()
        },
        auth: AuthConfig {
            jwt_secret: "integration-secret".into(),
            jwt_access_ttl_minutes: 15,
            leeway_seconds: 0,
            access_cookie_name: "accessToken".into(),
        },
        realtime: RealtimeConfig::default(),
        logging: LoggingConfig::default(),
    }
}

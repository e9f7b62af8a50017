//! Redis connection management.

use std::fmt;

use redis::Client;
use redis::aio::{ConnectionManager, PubSub};
use tracing::info;

use eventhub_core::error::{AppError, ErrorKind};
use eventhub_core::result::AppResult;

/// Redis client wrapper holding a reconnecting command connection.
///
/// Subscriptions need a dedicated connection each, so they are opened
/// on demand from the underlying client.
#[derive(Clone)]
pub struct RedisBusClient {
    /// Client used to open pub/sub connections.
    client: Client,
    /// Redis connection manager (pooled, reconnecting).
    conn: ConnectionManager,
    /// Masked URL for logs.
    display_url: String,
}

impl RedisBusClient {
    /// Connect to Redis at the given URL.
    pub async fn connect(url: &str) -> AppResult<Self> {
        let display_url = mask_redis_url(url);
        info!(url = %display_url, "Connecting to Redis");

        let client = Client::open(url).map_err(|e| {
            AppError::with_source(ErrorKind::BusUnavailable, "Failed to create Redis client", e)
        })?;

        let conn = ConnectionManager::new(client.clone()).await.map_err(|e| {
            AppError::with_source(ErrorKind::BusUnavailable, "Failed to connect to Redis", e)
        })?;

        info!("Successfully connected to Redis");
        Ok(Self {
            client,
            conn,
            display_url,
        })
    }

    /// Get a mutable clone of the connection manager.
    pub fn conn_mut(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Open a fresh pub/sub connection.
    pub async fn pubsub(&self) -> AppResult<PubSub> {
        self.client.get_async_pubsub().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::BusUnavailable,
                "Failed to open Redis pub/sub connection",
                e,
            )
        })
    }
}

impl fmt::Debug for RedisBusClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBusClient")
            .field("url", &self.display_url)
            .finish()
    }
}

/// Mask password in Redis URL for safe logging.
fn mask_redis_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos >= scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}

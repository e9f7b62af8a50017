//! WebSocket upgrade handler.

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use axum_extra::TypedHeader;
use axum_extra::headers::Cookie;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use eventhub_realtime::connection::authenticator::{AuthenticatedConnection, SocketAuthenticator};
use eventhub_realtime::message::types::ServerEvent;

use crate::state::AppState;

/// How long the writer gets to flush queued frames after the session ends.
const WRITER_DRAIN: Duration = Duration::from_secs(2);

/// Handshake query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Access token; takes precedence over the cookie.
    pub token: Option<String>,
}

/// GET /ws?token={jwt}
///
/// The socket is always upgraded. A rejected handshake receives a single
/// `auth_error` frame followed by a close frame.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    cookies: Option<TypedHeader<Cookie>>,
) -> Response {
    let cookie_token = cookies
        .as_ref()
        .and_then(|TypedHeader(jar)| jar.get(&state.config.auth.access_cookie_name));
    let token = SocketAuthenticator::select_token(query.token.as_deref(), cookie_token);

    match state.realtime.authenticate(token) {
        Ok(identity) => ws.on_upgrade(move |socket| run_session(state, identity, socket)),
        Err(e) => ws.on_upgrade(move |socket| reject(socket, e.message)),
    }
}

async fn reject(mut socket: WebSocket, reason: String) {
    if let Some(frame) = ServerEvent::auth_error(reason).to_frame() {
        if socket.send(Message::Text(frame.into())).await.is_err() {
            return;
        }
    }
    let close = CloseFrame {
        code: close_code::POLICY,
        reason: Utf8Bytes::from_static("Authentication failed"),
    };
    if let Err(e) = socket.send(Message::Close(Some(close))).await {
        debug!(error = %e, "Peer left before the close frame");
    }
}

async fn run_session(state: AppState, identity: AuthenticatedConnection, socket: WebSocket) {
    let engine = &state.realtime;
    let user_id = identity.user_id;
    let (handle, mut outbound_rx) = engine.register(identity);
    let conn_id = handle.id;
    let (mut ws_tx, mut ws_rx) = socket.split();

    info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connection established");

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let shutdown = engine.shutdown_token();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            next = ws_rx.next() => match next {
                Some(Ok(Message::Text(text))) => {
                    engine.handle_inbound(&handle, text.as_str()).await;
                }
                Some(Ok(Message::Binary(_))) => {
                    handle.send_event(&ServerEvent::error("Binary frames are not supported"));
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            },
        }
    }

    engine.unregister(&conn_id).await;
    drop(handle);

    // The writer exits once the last sender is gone.
    if tokio::time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
        writer.abort();
    }

    info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connection closed");
}

//! Integration tests for the WebSocket gateway.

mod helpers;

use futures::StreamExt;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use eventhub_core::types::{EventId, UserId, UserRole};

use helpers::{TestApp, WsClient, next_json, ping, send_json};

async fn expect_rejection(ws: &mut WsClient, reason: &str) {
    let frame = next_json(ws).await;
    assert_eq!(frame["event"], "auth_error");
    assert_eq!(frame["data"]["message"], reason);

    match ws.next().await {
        Some(Ok(Message::Close(Some(close)))) => assert_eq!(close.code, CloseCode::Policy),
        other => panic!("expected close frame, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect(None).await;

    expect_rejection(&mut ws, "Authentication required").await;
    assert_eq!(app.engine.connections.connection_count(), 0);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = TestApp::spawn().await;
    let expired = app.token_with_ttl(42, UserRole::User, -5);
    let mut ws = app.connect(Some(&expired)).await;

    expect_rejection(&mut ws, "Token has expired").await;
    assert_eq!(app.engine.connections.connection_count(), 0);
    assert_eq!(app.engine.metrics.snapshot().auth_failures, 1);
}

#[tokio::test]
async fn test_ping_pong() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect(Some(&app.token(1, UserRole::User))).await;

    send_json(&mut ws, json!({"event": "ping"})).await;
    let pong = next_json(&mut ws).await;
    assert_eq!(pong["event"], "pong");
    assert!(pong["data"]["timestamp"].as_i64().is_some_and(|ms| ms > 0));
}

#[tokio::test]
async fn test_cookie_token_is_accepted() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_with_cookie(&app.token(9, UserRole::User)).await;

    ping(&mut ws).await;
    assert!(app.engine.connections.presence().is_online(UserId::new(9)));
}

#[tokio::test]
async fn test_unknown_event_gets_error_frame() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_as(1, UserRole::User).await;

    send_json(&mut ws, json!({"event": "launch_rockets"})).await;
    assert_eq!(next_json(&mut ws).await["event"], "error");

    ping(&mut ws).await;
}

#[tokio::test]
async fn test_user_notification_reaches_every_tab() {
    let app = TestApp::spawn().await;
    let mut tab1 = app.connect_as(42, UserRole::User).await;
    let mut tab2 = app.connect_as(42, UserRole::User).await;
    let mut other = app.connect_as(43, UserRole::User).await;

    app.publisher
        .publish_to_user(UserId::new(42), "booking_confirmed", json!({"bookingId": 9}))
        .await
        .unwrap();
    app.publisher
        .publish_to_user(UserId::new(43), "marker", json!({}))
        .await
        .unwrap();

    for tab in [&mut tab1, &mut tab2] {
        let frame = next_json(tab).await;
        assert_eq!(frame["event"], "booking_confirmed");
        assert_eq!(frame["data"]["bookingId"], 9);
        assert!(frame["data"]["timestamp"].is_string());
    }
    assert_eq!(next_json(&mut other).await["event"], "marker");
}

#[tokio::test]
async fn test_event_room_fan_out() {
    let app = TestApp::spawn().await;
    let mut a = app.connect_as(1, UserRole::User).await;
    let mut b = app.connect_as(2, UserRole::User).await;
    let mut c = app.connect_as(3, UserRole::User).await;

    for ws in [&mut a, &mut b] {
        send_json(ws, json!({"event": "join_event_room", "data": {"eventId": 7}})).await;
        ping(ws).await;
    }

    app.publisher
        .publish_to_event(EventId::new(7), "event_updated", json!({"title": "X"}))
        .await
        .unwrap();
    app.publisher
        .publish_to_user(UserId::new(3), "marker", json!({}))
        .await
        .unwrap();

    for ws in [&mut a, &mut b] {
        let frame = next_json(ws).await;
        assert_eq!(frame["event"], "event_updated");
        assert_eq!(frame["data"]["title"], "X");
    }
    assert_eq!(next_json(&mut c).await["event"], "marker");

    send_json(&mut a, json!({"event": "leave_event_room", "data": 7})).await;
    ping(&mut a).await;
    app.publisher
        .publish_to_event(EventId::new(7), "event_updated", json!({}))
        .await
        .unwrap();
    app.publisher
        .publish_to_user(UserId::new(1), "marker", json!({}))
        .await
        .unwrap();

    assert_eq!(next_json(&mut b).await["event"], "event_updated");
    assert_eq!(next_json(&mut a).await["event"], "marker");
}

#[tokio::test]
async fn test_admin_dashboard() {
    let app = TestApp::spawn().await;
    let mut admin = app.connect_as(1, UserRole::Admin).await;

    let _user = app.connect_as(2, UserRole::User).await;
    let update = next_json(&mut admin).await;
    assert_eq!(update["event"], "dashboard_online_update");
    assert_eq!(update["data"]["onlineUsers"], 2);

    send_json(&mut admin, json!({"event": "request_admin_stats"})).await;
    let stats = next_json(&mut admin).await;
    assert_eq!(stats["event"], "dashboard_stats_update");
    assert_eq!(stats["data"]["totalUsers"], 120);
    assert_eq!(stats["data"]["pendingRequests"], 4);
    assert!(stats["data"]["updatedAt"].is_string());
    assert_eq!(next_json(&mut admin).await["event"], "dashboard_online_update");

    app.publisher
        .publish_admin("new_report", json!({"id": 3}))
        .await
        .unwrap();
    assert_eq!(next_json(&mut admin).await["event"], "new_report");
}

#[tokio::test]
async fn test_organizer_stats_and_permissions() {
    let app = TestApp::spawn().await;
    let mut organizer = app.connect_as(8, UserRole::Organizer).await;
    let mut user = app.connect_as(9, UserRole::User).await;

    send_json(&mut organizer, json!({"event": "request_organizer_stats"})).await;
    let stats = next_json(&mut organizer).await;
    assert_eq!(stats["event"], "organizer_stats_update");
    assert_eq!(stats["data"]["totalEvents"], 8);
    assert_eq!(stats["data"]["registrationsThisMonth"], 5);

    send_json(&mut user, json!({"event": "request_organizer_stats"})).await;
    let denied = next_json(&mut user).await;
    assert_eq!(denied["event"], "error");
    assert_eq!(denied["data"]["message"], "Insufficient permissions");
}

#[tokio::test]
async fn test_disconnect_clears_presence() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_as(5, UserRole::User).await;
    assert_eq!(app.engine.connections.online_count(), 1);

    ws.close(None).await.unwrap();
    app.wait_until(|engine| engine.connections.online_count() == 0)
        .await;
    assert_eq!(app.engine.connections.connection_count(), 0);
}

#[tokio::test]
async fn test_engine_shutdown_closes_sockets() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_as(5, UserRole::User).await;

    app.engine.shutdown().await.unwrap();

    let closed = loop {
        match ws.next().await {
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break true,
            Some(Ok(_)) => continue,
        }
    };
    assert!(closed);
    assert_eq!(app.engine.connections.connection_count(), 0);
}

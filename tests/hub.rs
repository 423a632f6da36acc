//! End-to-end tests against a hub served on an ephemeral port.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use pubsub_hub::api;
use pubsub_hub::api::handlers::system::HealthResponse;
use pubsub_hub::app_state::AppState;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(2);

async fn spawn_hub() -> (SocketAddr, AppState) {
    let state = AppState::new();
    let app = api::build_router("static").with_state(state.clone());
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, state)
}

/// Opens a subscriber connection without sending its control message.
async fn connect_pending(addr: SocketAddr, state: &AppState) -> Client {
    let before = state.pubsub_service.registry().len();
    let Ok((ws, _)) = connect_async(format!("ws://{addr}/subscribe")).await else {
        panic!("websocket connect failed");
    };
    wait_for_members(state, before + 1).await;
    ws
}

async fn send_control(ws: &mut Client, control: &str) {
    let Ok(()) = ws.send(Message::text(control)).await else {
        panic!("send control failed");
    };
}

async fn connect(addr: SocketAddr, state: &AppState, control: &str) -> Client {
    let mut ws = connect_pending(addr, state).await;
    send_control(&mut ws, control).await;
    ws
}

async fn wait_for_members(state: &AppState, expected: usize) {
    let registry = state.pubsub_service.registry();
    let polled = tokio::time::timeout(WAIT, async {
        while registry.len() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    let Ok(()) = polled else {
        panic!("expected {expected} members, have {}", registry.len());
    };
}

/// Returns the next text frame, or `None` on close, end of stream or timeout.
async fn next_text(ws: &mut Client) -> Option<String> {
    loop {
        let frame = tokio::time::timeout(WAIT, ws.next()).await.ok()??;
        match frame.ok()? {
            Message::Text(text) => return Some(text.as_str().to_string()),
            Message::Close(_) => return None,
            _ => {}
        }
    }
}

async fn publish(addr: SocketAddr, body: &str) -> u16 {
    let Ok(resp) = reqwest::Client::new()
        .post(format!("http://{addr}/publish"))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
    else {
        panic!("publish request failed");
    };
    resp.status().as_u16()
}

#[tokio::test]
async fn subscribers_are_counted() {
    let (addr, state) = spawn_hub().await;
    let mut clients = Vec::new();
    for _ in 0..3 {
        clients.push(connect(addr, &state, r#"{"action":"subscribe"}"#).await);
    }
    assert_eq!(state.pubsub_service.registry().len(), 3);

    let Ok(resp) = reqwest::get(format!("http://{addr}/health")).await else {
        panic!("health request failed");
    };
    let Ok(health) = resp.json::<HealthResponse>().await else {
        panic!("health body did not decode");
    };
    assert_eq!(health.status, "healthy");
    assert_eq!(health.subscribers, 3);
}

#[tokio::test]
async fn hello_then_world_after_unsubscribe() {
    let (addr, state) = spawn_hub().await;
    let mut a = connect(addr, &state, r#"{"action":"subscribe"}"#).await;
    // Registered on upgrade, before any control message.
    let mut b = connect_pending(addr, &state).await;

    assert_eq!(publish(addr, r#"{"action":"publish","message":"hello"}"#).await, 200);
    assert_eq!(next_text(&mut a).await.as_deref(), Some("\"hello\""));
    assert_eq!(next_text(&mut b).await.as_deref(), Some("\"hello\""));

    send_control(&mut b, r#"{"action":"unsubscribe"}"#).await;
    wait_for_members(&state, 1).await;

    assert_eq!(publish(addr, r#"{"action":"publish","message":"world"}"#).await, 200);
    assert_eq!(next_text(&mut a).await.as_deref(), Some("\"world\""));
    assert_eq!(next_text(&mut b).await, None);
}

#[tokio::test]
async fn unsubscribed_client_gets_nothing() {
    let (addr, state) = spawn_hub().await;
    let mut a = connect(addr, &state, r#"{"action":"subscribe"}"#).await;
    let mut b = connect(addr, &state, r#"{"action":"unsubscribe"}"#).await;
    wait_for_members(&state, 1).await;

    assert_eq!(publish(addr, r#"{"action":"publish","message":"world"}"#).await, 200);
    assert_eq!(next_text(&mut a).await.as_deref(), Some("\"world\""));
    assert_eq!(next_text(&mut b).await, None);
}

#[tokio::test]
async fn invalid_action_stays_subscribed() {
    let (addr, state) = spawn_hub().await;
    let mut ws = connect(addr, &state, r#"{"action":"bogus"}"#).await;

    assert_eq!(next_text(&mut ws).await.as_deref(), Some("invalid message"));
    assert_eq!(state.pubsub_service.registry().len(), 1);

    assert_eq!(publish(addr, r#"{"action":"publish","message":"still here"}"#).await, 200);
    assert_eq!(next_text(&mut ws).await.as_deref(), Some("\"still here\""));
}

#[tokio::test]
async fn null_action_stays_subscribed() {
    let (addr, state) = spawn_hub().await;
    let mut ws = connect(addr, &state, r#"{"action":null}"#).await;

    assert_eq!(next_text(&mut ws).await.as_deref(), Some("invalid message"));
    assert_eq!(state.pubsub_service.registry().len(), 1);

    assert_eq!(publish(addr, r#"{"action":"publish","message":null}"#).await, 200);
    assert_eq!(next_text(&mut ws).await.as_deref(), Some("\"\""));
}

#[tokio::test]
async fn malformed_control_message_drops_connection() {
    let (addr, state) = spawn_hub().await;
    let mut ws = connect(addr, &state, "not json").await;
    wait_for_members(&state, 0).await;
    assert_eq!(next_text(&mut ws).await, None);
}

#[tokio::test]
async fn rejected_publishes_leave_membership_unchanged() {
    let (addr, state) = spawn_hub().await;
    let _ws = connect(addr, &state, r#"{"action":"subscribe"}"#).await;

    assert_eq!(publish(addr, r#"{"action":"bogus"}"#).await, 400);
    assert_eq!(publish(addr, "{oops").await, 400);
    assert_eq!(state.pubsub_service.registry().len(), 1);

    let Ok(resp) = reqwest::get(format!("http://{addr}/publish")).await else {
        panic!("get request failed");
    };
    assert_eq!(resp.status().as_u16(), 405);
}

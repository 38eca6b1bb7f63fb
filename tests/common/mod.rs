#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use curbcast::auth::{Claims, JwtVerifier};
use curbcast::routes;
use curbcast::state::AppState;
use curbcast::store::{NotificationStore, StoreError};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_SERVICE_KEY: &str = "test-service-key";

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Notification store double that records calls and can be flipped into a
/// failing mode.
#[derive(Default)]
pub struct RecordingStore {
    pub calls: Mutex<Vec<(String, Vec<String>)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl NotificationStore for RecordingStore {
    async fn mark_as_read(&self, user_id: &str, ids: &[String]) -> Result<u64, StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError("store offline".to_string()));
        }
        self.calls
            .lock()
            .unwrap()
            .push((user_id.to_string(), ids.to_vec()));
        Ok(ids.len() as u64)
    }
}

/// Test server that owns the full AppState, so tests can inspect the
/// registry and room index directly. Each instance is isolated.
pub struct TestServer {
    pub state: AppState,
    pub store: Arc<RecordingStore>,
}

impl TestServer {
    pub fn new() -> Self {
        let store = Arc::new(RecordingStore::default());
        let state = AppState::new(
            Arc::new(JwtVerifier::new(TEST_SECRET)),
            Arc::clone(&store) as Arc<dyn NotificationStore>,
            Some(TEST_SERVICE_KEY.to_string()),
            vec!["*".to_string()],
        );
        Self { state, store }
    }

    /// Returns an axum Router wired to this server's state for `oneshot()` calls.
    pub fn router(&self) -> axum::Router {
        routes::router(self.state.clone())
    }

    /// Binds a TCP listener on port 0, spawns the server, and returns `host:port`.
    pub async fn spawn(&self) -> String {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("127.0.0.1:{}", addr.port())
    }
}

pub fn mint_token(sub: &str) -> String {
    token_with_expiry(sub, chrono::Utc::now().timestamp() + 3600)
}

pub fn expired_token(sub: &str) -> String {
    token_with_expiry(sub, chrono::Utc::now().timestamp() - 3600)
}

fn token_with_expiry(sub: &str, exp: i64) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

pub async fn connect(base: &str) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{base}/ws")).await.unwrap();
    ws
}

pub async fn send_event(ws: &mut WsClient, frame: serde_json::Value) {
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();
}

/// Receives the next JSON event frame, skipping protocol-level ping/pong.
pub async fn recv_event(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("connection closed")
            .expect("transport error");
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Asserts that no event frame arrives within `dur`.
pub async fn expect_silence(ws: &mut WsClient, dur: Duration) {
    let deadline = tokio::time::Instant::now() + dur;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return;
        }
        match tokio::time::timeout(remaining, ws.next()).await {
            Err(_) => return,
            Ok(Some(Ok(Message::Text(text)))) => panic!("unexpected event: {text}"),
            Ok(Some(Ok(_))) => continue,
            Ok(_) => return,
        }
    }
}

/// Authenticates as `sub` and returns the `authenticated` event.
pub async fn authenticate(ws: &mut WsClient, sub: &str) -> serde_json::Value {
    send_event(
        ws,
        serde_json::json!({
            "type": "authenticate",
            "data": { "token": mint_token(sub) }
        }),
    )
    .await;
    let event = recv_event(ws).await;
    assert_eq!(event["type"], "authenticated", "auth failed: {event}");
    event
}

/// Polls `predicate` until it holds or a short deadline passes. Used to wait
/// out cross-connection races (joins, disconnect cleanup).
pub async fn wait_for(mut predicate: impl FnMut() -> bool) {
    for _ in 0..100 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached within deadline");
}

pub mod events;
pub mod registry;
pub mod rooms;
pub mod router;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::state::AppState;
use events::{ClientEvent, ServerEvent};
use registry::{ConnectionId, OUTBOUND_QUEUE};

/// Grace period for the first `authenticate` event.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(30);
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(90);

pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id: ConnectionId = Uuid::new_v4();
    let (mut ws_sink, mut ws_stream) = socket.split();

    // Outbound queue for this connection; the sender side lives in the
    // registry once the connection authenticates.
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);

    // ---- authentication phase -------------------------------------------
    // Nothing but `authenticate` is processed here; replies go straight to
    // the sink because the registry does not know this connection yet.
    let auth_timeout = tokio::time::sleep(AUTH_TIMEOUT);
    tokio::pin!(auth_timeout);

    let user_id: String;
    loop {
        tokio::select! {
            _ = &mut auth_timeout => {
                let frame = ServerEvent::AuthenticationError {
                    message: "authentication timed out".to_string(),
                }
                .to_frame();
                let _ = ws_sink.send(Message::Text(frame.into())).await;
                let _ = ws_sink.send(Message::Close(None)).await;
                return;
            }
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(ClientEvent::Authenticate { token }) => {
                                match state.verifier.verify(&token) {
                                    Ok(claims) => {
                                        user_id = claims.sub;
                                        state.registry.bind(conn_id, &user_id, tx.clone());
                                        state.rooms.join(&rooms::user_room(&user_id), conn_id);
                                        let frame = ServerEvent::Authenticated {
                                            user_id: user_id.clone(),
                                            timestamp: Utc::now(),
                                        }
                                        .to_frame();
                                        if ws_sink.send(Message::Text(frame.into())).await.is_err() {
                                            disconnect(&state, conn_id);
                                            return;
                                        }
                                        tracing::debug!(%conn_id, user_id, "connection authenticated");
                                        break;
                                    }
                                    Err(e) => {
                                        tracing::debug!(%conn_id, error = %e, "authentication failed");
                                        let frame = ServerEvent::AuthenticationError {
                                            message: e.to_string(),
                                        }
                                        .to_frame();
                                        let _ = ws_sink.send(Message::Text(frame.into())).await;
                                        let _ = ws_sink.send(Message::Close(None)).await;
                                        return;
                                    }
                                }
                            }
                            Ok(_) => {
                                let frame = ServerEvent::not_authenticated().to_frame();
                                if ws_sink.send(Message::Text(frame.into())).await.is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                let frame =
                                    ServerEvent::error(format!("invalid event: {e}")).to_frame();
                                if ws_sink.send(Message::Text(frame.into())).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => return,
                }
            }
        }
    }

    // ---- main loop -------------------------------------------------------
    let mut last_pong = tokio::time::Instant::now();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // the first tick completes immediately

    loop {
        tokio::select! {
            Some(frame) = rx.recv() => {
                if ws_sink.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if last_pong.elapsed() > HEARTBEAT_TIMEOUT {
                    tracing::debug!(%conn_id, "heartbeat timeout");
                    break;
                }
                if ws_sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => router::dispatch(&state, conn_id, event).await,
                            Err(e) => router::send_to_connection(
                                &state,
                                conn_id,
                                &ServerEvent::error(format!("invalid event: {e}")),
                            ),
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = tokio::time::Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    disconnect(&state, conn_id);
}

/// Full teardown: room memberships, registry binding, and a best-effort
/// `user_offline` broadcast to everyone still connected. Fires per
/// connection, so a user's other devices still see the closed one go away.
fn disconnect(state: &AppState, conn_id: ConnectionId) {
    state.rooms.leave_all(conn_id);
    let Some(entry) = state.registry.unbind(conn_id) else {
        return;
    };
    tracing::info!(%conn_id, user_id = entry.user_id, "connection closed");

    let frame = ServerEvent::UserOffline {
        user_id: entry.user_id,
        timestamp: Utc::now(),
    }
    .to_frame();
    state.registry.for_each_sender(|peer, tx| {
        if tx.try_send(frame.clone()).is_err() {
            tracing::debug!(%peer, "outbound queue full, dropping user_offline");
        }
    });
}

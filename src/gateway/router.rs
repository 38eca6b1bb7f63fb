use chrono::Utc;
use uuid::Uuid;

use super::events::{ClientEvent, ServerEvent};
use super::registry::ConnectionId;
use super::rooms;
use crate::state::AppState;

pub(crate) fn send_frame(state: &AppState, conn_id: ConnectionId, frame: &str) {
    if let Some(tx) = state.registry.sender_of(conn_id) {
        if tx.try_send(frame.to_string()).is_err() {
            tracing::debug!(%conn_id, "outbound queue full, dropping frame");
        }
    }
}

pub(crate) fn send_to_connection(state: &AppState, conn_id: ConnectionId, event: &ServerEvent) {
    send_frame(state, conn_id, &event.to_frame());
}

fn send_to_room(state: &AppState, room: &str, except: Option<ConnectionId>, event: &ServerEvent) {
    let frame = event.to_frame();
    for member in state.rooms.members_of(room) {
        if Some(member) != except {
            send_frame(state, member, &frame);
        }
    }
}

fn broadcast_except(state: &AppState, except: ConnectionId, event: &ServerEvent) {
    let frame = event.to_frame();
    state.registry.for_each_sender(|conn_id, tx| {
        if conn_id != except && tx.try_send(frame.clone()).is_err() {
            tracing::debug!(%conn_id, "outbound queue full, dropping frame");
        }
    });
}

/// Dispatches one authenticated inbound event. The connection loop only
/// calls this after the auth phase, but the registry binding is re-checked
/// so a race with teardown degrades to a dropped event, never a wrong sender
/// identity.
pub async fn dispatch(state: &AppState, conn_id: ConnectionId, event: ClientEvent) {
    let Some(user_id) = state.registry.user_of(conn_id) else {
        tracing::debug!(%conn_id, "dropping event from unbound connection");
        return;
    };

    match event {
        ClientEvent::Authenticate { .. } => {
            send_to_connection(state, conn_id, &ServerEvent::error("already authenticated"));
        }
        ClientEvent::LocationUpdate {
            coordinates,
            accuracy,
        } => {
            broadcast_except(
                state,
                conn_id,
                &ServerEvent::CollectorLocationUpdate {
                    collector_id: user_id,
                    coordinates,
                    accuracy,
                    timestamp: Utc::now(),
                },
            );
        }
        ClientEvent::MissionStatusUpdate {
            mission_id,
            status,
            data,
        } => {
            // Customer-less updates have no addressable target; nothing to do.
            let Some(customer_id) = data.get("customerId").and_then(|v| v.as_str()) else {
                tracing::debug!(mission_id, status, "mission status update without customerId");
                return;
            };
            send_to_room(
                state,
                &rooms::user_room(customer_id),
                None,
                &ServerEvent::MissionStatusChanged {
                    mission_id,
                    status,
                    collector_id: user_id,
                    data: data.clone(),
                    timestamp: Utc::now(),
                },
            );
        }
        ClientEvent::TypingStart { conversation_id } => {
            send_to_room(
                state,
                &rooms::conversation_room(&conversation_id),
                Some(conn_id),
                &ServerEvent::UserTyping {
                    user_id,
                    conversation_id,
                    timestamp: Utc::now(),
                },
            );
        }
        ClientEvent::TypingStop { conversation_id } => {
            send_to_room(
                state,
                &rooms::conversation_room(&conversation_id),
                Some(conn_id),
                &ServerEvent::UserStoppedTyping {
                    user_id,
                    conversation_id,
                    timestamp: Utc::now(),
                },
            );
        }
        ClientEvent::SendMessage {
            conversation_id,
            message,
            recipient_id,
        } => {
            let message_id = Uuid::new_v4().to_string();
            let timestamp = Utc::now();
            send_to_room(
                state,
                &rooms::user_room(&recipient_id),
                None,
                &ServerEvent::NewMessage {
                    id: message_id.clone(),
                    conversation_id: conversation_id.clone(),
                    sender_id: user_id,
                    message,
                    timestamp,
                },
            );
            send_to_connection(
                state,
                conn_id,
                &ServerEvent::MessageSent {
                    message_id,
                    conversation_id,
                    timestamp,
                },
            );
        }
        ClientEvent::NotificationAck { notification_id } => {
            tracing::info!(user_id, notification_id, "notification acknowledged");
        }
        ClientEvent::MarkNotificationsRead { notification_ids } => {
            match state.store.mark_as_read(&user_id, &notification_ids).await {
                Ok(count) => {
                    send_to_connection(
                        state,
                        conn_id,
                        &ServerEvent::NotificationsMarkedRead {
                            count,
                            timestamp: Utc::now(),
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "notification store failed");
                    send_to_connection(
                        state,
                        conn_id,
                        &ServerEvent::error("failed to mark notifications read"),
                    );
                }
            }
        }
        ClientEvent::JoinConversation { conversation_id } => {
            state
                .rooms
                .join(&rooms::conversation_room(&conversation_id), conn_id);
        }
        ClientEvent::LeaveConversation { conversation_id } => {
            state
                .rooms
                .leave(&rooms::conversation_room(&conversation_id), conn_id);
        }
    }
}

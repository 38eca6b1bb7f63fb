use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire frames are JSON text messages shaped `{"type": ..., "data": {...}}`.
/// Event names are snake_case; payload fields are camelCase.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    Authenticate {
        token: String,
    },
    #[serde(rename_all = "camelCase")]
    LocationUpdate {
        coordinates: Coordinates,
        #[serde(default)]
        accuracy: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    MissionStatusUpdate {
        mission_id: String,
        status: String,
        #[serde(default)]
        data: Value,
    },
    #[serde(rename_all = "camelCase")]
    TypingStart {
        conversation_id: String,
    },
    #[serde(rename_all = "camelCase")]
    TypingStop {
        conversation_id: String,
    },
    #[serde(rename_all = "camelCase")]
    SendMessage {
        conversation_id: String,
        message: String,
        recipient_id: String,
    },
    #[serde(rename_all = "camelCase")]
    NotificationAck {
        notification_id: String,
    },
    #[serde(rename_all = "camelCase")]
    MarkNotificationsRead {
        notification_ids: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    JoinConversation {
        conversation_id: String,
    },
    #[serde(rename_all = "camelCase")]
    LeaveConversation {
        conversation_id: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Outbound envelopes born in the router. Bridge-born envelopes carry a
/// caller-chosen event name instead (see `bridge`).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    Authenticated {
        user_id: String,
        timestamp: DateTime<Utc>,
    },
    AuthenticationError {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    CollectorLocationUpdate {
        collector_id: String,
        coordinates: Coordinates,
        #[serde(skip_serializing_if = "Option::is_none")]
        accuracy: Option<f64>,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    MissionStatusChanged {
        mission_id: String,
        status: String,
        collector_id: String,
        data: Value,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    UserTyping {
        user_id: String,
        conversation_id: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    UserStoppedTyping {
        user_id: String,
        conversation_id: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    NewMessage {
        id: String,
        conversation_id: String,
        sender_id: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    MessageSent {
        message_id: String,
        conversation_id: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    NotificationsMarkedRead {
        count: u64,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    UserOffline {
        user_id: String,
        timestamp: DateTime<Utc>,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    pub fn not_authenticated() -> Self {
        ServerEvent::error("not authenticated")
    }

    /// Serializes to a wire frame. The closed enum cannot fail to serialize.
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!("failed to serialize server event: {e}");
            r#"{"type":"error","data":{"message":"internal serialization error"}}"#.to_string()
        })
    }
}

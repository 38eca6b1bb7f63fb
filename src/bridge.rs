use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::gateway::events::Coordinates;
use crate::gateway::registry::ConnectionRegistry;

/// Entry point for the business layer (mission assignment, pickup scheduling,
/// billing) to reach connected clients. Constructed with the registry at
/// server start; delivery is fire-and-forget with no queue or retry.
pub struct NotificationBridge {
    registry: Arc<ConnectionRegistry>,
}

impl NotificationBridge {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Delivers to every live connection of `user_id`. Returns `false` when
    /// the user has no live connections; the caller decides the fallback
    /// (e.g. a persisted notification).
    pub fn send_to_user(&self, user_id: &str, event: &str, payload: Value) -> bool {
        let conns = self.registry.connections_for(user_id);
        if conns.is_empty() {
            return false;
        }
        let frame = envelope(event, payload);
        for conn_id in conns {
            if let Some(tx) = self.registry.sender_of(conn_id) {
                if tx.try_send(frame.clone()).is_err() {
                    tracing::debug!(%conn_id, event, "outbound queue full, dropping bridge frame");
                }
            }
        }
        true
    }

    /// Delivers to every live connection.
    pub fn broadcast(&self, event: &str, payload: Value) -> bool {
        let frame = envelope(event, payload);
        self.registry.for_each_sender(|conn_id, tx| {
            if tx.try_send(frame.clone()).is_err() {
                tracing::debug!(%conn_id, event, "outbound queue full, dropping bridge frame");
            }
        });
        true
    }

    /// Stub contract: broadcasts with an `area` annotation merged into the
    /// payload. No spatial filtering happens until a geofencing collaborator
    /// is wired in; callers must not assume recipients are inside the area.
    pub fn send_to_area(
        &self,
        coordinates: Coordinates,
        radius: f64,
        event: &str,
        payload: Value,
    ) -> bool {
        let mut data = into_object(payload);
        data.insert(
            "area".to_string(),
            json!({ "coordinates": coordinates, "radius": radius }),
        );
        self.broadcast(event, Value::Object(data))
    }
}

fn into_object(payload: Value) -> Map<String, Value> {
    match payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("payload".to_string(), other);
            map
        }
    }
}

/// Bridge envelopes follow the router's wire shape but carry a caller-chosen
/// event name and opaque payload, stamped with the server time.
fn envelope(event: &str, payload: Value) -> String {
    let mut data = into_object(payload);
    data.insert("timestamp".to_string(), json!(Utc::now()));
    json!({ "type": event, "data": data }).to_string()
}

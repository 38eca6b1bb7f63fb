use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::gateway::events::Coordinates;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushUserRequest {
    pub user_id: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Deserialize)]
pub struct PushBroadcastRequest {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Deserialize)]
pub struct PushAreaRequest {
    pub coordinates: Coordinates,
    pub radius: f64,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

/// The push API is only for the platform's own services. Without a
/// configured key the whole surface stays dark.
fn require_service_key(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = state.service_key.as_deref() else {
        return Err(AppError::Unauthorized("internal API disabled".to_string()));
    };
    let provided = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if provided == Some(expected) {
        Ok(())
    } else {
        Err(AppError::Unauthorized("invalid service key".to_string()))
    }
}

pub async fn push_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PushUserRequest>,
) -> Result<Json<Value>, AppError> {
    require_service_key(&state, &headers)?;
    if req.user_id.is_empty() {
        return Err(AppError::BadRequest("userId must not be empty".to_string()));
    }
    let delivered = state.bridge.send_to_user(&req.user_id, &req.event, req.payload);
    Ok(Json(json!({ "delivered": delivered })))
}

pub async fn push_broadcast(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PushBroadcastRequest>,
) -> Result<Json<Value>, AppError> {
    require_service_key(&state, &headers)?;
    let delivered = state.bridge.broadcast(&req.event, req.payload);
    Ok(Json(json!({ "delivered": delivered })))
}

pub async fn push_area(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PushAreaRequest>,
) -> Result<Json<Value>, AppError> {
    require_service_key(&state, &headers)?;
    let delivered = state
        .bridge
        .send_to_area(req.coordinates, req.radius, &req.event, req.payload);
    Ok(Json(json!({ "delivered": delivered })))
}

use std::sync::Arc;

use crate::auth::CredentialVerifier;
use crate::bridge::NotificationBridge;
use crate::gateway::registry::ConnectionRegistry;
use crate::gateway::rooms::RoomIndex;
use crate::store::NotificationStore;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub rooms: Arc<RoomIndex>,
    pub bridge: Arc<NotificationBridge>,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub store: Arc<dyn NotificationStore>,
    /// Shared key guarding the internal push API. `None` disables it.
    pub service_key: Option<String>,
    pub allowed_origins: Vec<String>,
}

impl AppState {
    pub fn new(
        verifier: Arc<dyn CredentialVerifier>,
        store: Arc<dyn NotificationStore>,
        service_key: Option<String>,
        allowed_origins: Vec<String>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let bridge = Arc::new(NotificationBridge::new(Arc::clone(&registry)));
        Self {
            registry,
            rooms: Arc::new(RoomIndex::new()),
            bridge,
            verifier,
            store,
            service_key,
            allowed_origins,
        }
    }
}

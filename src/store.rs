use async_trait::async_trait;

#[derive(Debug)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persistence seam for notification read-state. The real store lives in the
/// platform's persistence layer; this crate only calls through it when a
/// client marks notifications read.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Marks the given notification IDs read for `user_id` and returns how
    /// many were acknowledged.
    async fn mark_as_read(&self, user_id: &str, ids: &[String]) -> Result<u64, StoreError>;
}

/// Default store used when the binary runs standalone: logs the request and
/// acknowledges everything.
pub struct LoggingNotificationStore;

#[async_trait]
impl NotificationStore for LoggingNotificationStore {
    async fn mark_as_read(&self, user_id: &str, ids: &[String]) -> Result<u64, StoreError> {
        tracing::info!(user_id, count = ids.len(), "marking notifications read");
        Ok(ids.len() as u64)
    }
}

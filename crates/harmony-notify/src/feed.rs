use harmony_core::{HarmonyError, Notification, NotificationId, NotificationStore, Result, UserId};
use std::sync::Arc;
use tracing::debug;

/// Read side of the in-app feed, as served to a user.
#[derive(Clone)]
pub struct NotificationFeed {
    store: Arc<dyn NotificationStore>,
}

impl NotificationFeed {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Newest first.
    pub async fn list(&self, user: UserId) -> Result<Vec<Notification>> {
        self.store.get_by_user(user).await
    }

    pub async fn unread(&self, user: UserId) -> Result<Vec<Notification>> {
        self.store.get_unread_by_user(user).await
    }

    pub async fn unread_count(&self, user: UserId) -> Result<usize> {
        Ok(self.unread(user).await?.len())
    }

    pub async fn get(&self, id: NotificationId) -> Result<Notification> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| HarmonyError::NotFound(format!("notification {}", id)))
    }

    /// Idempotent: marking a read notification again is a no-op.
    pub async fn mark_read(&self, id: NotificationId) -> Result<()> {
        let notification = self.get(id).await?;
        if notification.read {
            return Ok(());
        }
        self.store.mark_as_read(id).await?;
        debug!(notification = %id, "marked read");
        Ok(())
    }

    pub async fn mark_all_read(&self, user: UserId) -> Result<()> {
        self.store.mark_all_as_read(user).await?;
        debug!(%user, "marked all read");
        Ok(())
    }

    pub async fn delete(&self, id: NotificationId) -> Result<()> {
        self.get(id).await?;
        self.store.delete(id).await
    }
}

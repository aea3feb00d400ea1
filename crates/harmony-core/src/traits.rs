use crate::{Notification, NotificationId, Result, User, UserId};
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence for the in-app notification feed.
///
/// Implementations own their concurrency safety; the dispatcher calls them
/// from many tasks at once.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, notification: Notification) -> Result<()>;
    /// Newest first.
    async fn get_by_user(&self, user_id: UserId) -> Result<Vec<Notification>>;
    /// Newest first, `read == false` only.
    async fn get_unread_by_user(&self, user_id: UserId) -> Result<Vec<Notification>>;
    async fn get_by_id(&self, id: NotificationId) -> Result<Option<Notification>>;
    async fn mark_as_read(&self, id: NotificationId) -> Result<()>;
    async fn mark_all_as_read(&self, user_id: UserId) -> Result<()>;
    async fn delete(&self, id: NotificationId) -> Result<()>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>>;
    async fn get_all(&self) -> Result<Vec<User>>;
}

/// Templated email delivery, one method per event category.
///
/// A gateway without SMTP credentials returns `Ok(())` without sending.
#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()>;

    async fn send_user_created(&self, to: &str, name: &str, password: &str) -> Result<()>;
    async fn send_user_updated(&self, to: &str, name: &str, changes: &[String]) -> Result<()>;
    async fn send_user_deleted(&self, to: &str, name: &str) -> Result<()>;

    async fn send_issue_created(&self, to: &str, issue_title: &str, issue_id: Uuid) -> Result<()>;
    async fn send_issue_updated(
        &self,
        to: &str,
        issue_title: &str,
        issue_id: Uuid,
        changes: &[String],
    ) -> Result<()>;
    async fn send_issue_assigned(
        &self,
        to: &str,
        issue_title: &str,
        issue_id: Uuid,
        assigner_name: &str,
    ) -> Result<()>;

    async fn send_project_created(
        &self,
        to: &str,
        project_name: &str,
        project_id: Uuid,
    ) -> Result<()>;
    async fn send_project_updated(
        &self,
        to: &str,
        project_name: &str,
        project_id: Uuid,
        changes: &[String],
    ) -> Result<()>;

    async fn send_notification(
        &self,
        to: &str,
        title: &str,
        message: &str,
        notification_id: NotificationId,
    ) -> Result<()>;
}

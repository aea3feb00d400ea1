use async_trait::async_trait;
use dashmap::DashMap;
use harmony_core::{
    HarmonyError, Notification, NotificationId, NotificationStore, Result, User, UserDirectory,
    UserId,
};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Feed {
    next_seq: u64,
    // Insertion sequence breaks ties between equal `created_at` values.
    rows: HashMap<NotificationId, (u64, Notification)>,
}

impl Feed {
    fn newest_first<'a>(&'a self, filter: impl Fn(&Notification) -> bool) -> Vec<Notification> {
        let mut rows: Vec<&'a (u64, Notification)> =
            self.rows.values().filter(|(_, n)| filter(n)).collect();
        rows.sort_by(|(sa, a), (sb, b)| b.created_at.cmp(&a.created_at).then(sb.cmp(sa)));
        rows.into_iter().map(|(_, n)| n.clone()).collect()
    }
}

/// Notification store kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    feed: RwLock<Feed>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.feed.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all(&self) -> Vec<Notification> {
        self.feed.read().newest_first(|_| true)
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn create(&self, notification: Notification) -> Result<()> {
        let mut feed = self.feed.write();
        if feed.rows.contains_key(&notification.id) {
            return Err(HarmonyError::Store(format!(
                "notification {} already exists",
                notification.id
            )));
        }
        let seq = feed.next_seq;
        feed.next_seq += 1;
        feed.rows.insert(notification.id, (seq, notification));
        Ok(())
    }

    async fn get_by_user(&self, user_id: UserId) -> Result<Vec<Notification>> {
        Ok(self.feed.read().newest_first(|n| n.user_id == user_id))
    }

    async fn get_unread_by_user(&self, user_id: UserId) -> Result<Vec<Notification>> {
        Ok(self
            .feed
            .read()
            .newest_first(|n| n.user_id == user_id && !n.read))
    }

    async fn get_by_id(&self, id: NotificationId) -> Result<Option<Notification>> {
        Ok(self.feed.read().rows.get(&id).map(|(_, n)| n.clone()))
    }

    async fn mark_as_read(&self, id: NotificationId) -> Result<()> {
        let mut feed = self.feed.write();
        let (_, notification) = feed
            .rows
            .get_mut(&id)
            .ok_or_else(|| HarmonyError::NotFound(format!("notification {}", id)))?;
        notification.mark_read();
        Ok(())
    }

    async fn mark_all_as_read(&self, user_id: UserId) -> Result<()> {
        let mut feed = self.feed.write();
        for (_, notification) in feed.rows.values_mut() {
            if notification.user_id == user_id {
                notification.mark_read();
            }
        }
        Ok(())
    }

    async fn delete(&self, id: NotificationId) -> Result<()> {
        self.feed
            .write()
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| HarmonyError::NotFound(format!("notification {}", id)))
    }
}

/// User directory backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<UserId, User>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let directory = Self::new();
        for user in users {
            directory.insert(user);
        }
        directory
    }

    pub fn insert(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn remove(&self, id: UserId) -> Option<User> {
        self.users.remove(&id).map(|(_, user)| user)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn get_all(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }
}

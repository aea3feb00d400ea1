use crate::HarmonyError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type UserId = Uuid;
pub type NotificationId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    TeamLead,
    Admin,
}

impl Role {
    /// Admins and team leads receive the broadcast notifications.
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Admin | Role::TeamLead)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::TeamLead => "team_lead",
            Role::Admin => "admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = HarmonyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "team_lead" => Ok(Role::TeamLead),
            "admin" => Ok(Role::Admin),
            other => Err(HarmonyError::InvalidInput(format!("unknown role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Comment,
    Assignment,
    Complete,
    User,
    Status,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::Comment => "comment",
            NotificationType::Assignment => "assignment",
            NotificationType::Complete => "complete",
            NotificationType::User => "user",
            NotificationType::Status => "status",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = HarmonyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "comment" => Ok(NotificationType::Comment),
            "assignment" => Ok(NotificationType::Assignment),
            "complete" => Ok(NotificationType::Complete),
            "user" => Ok(NotificationType::User),
            "status" => Ok(NotificationType::Status),
            other => Err(HarmonyError::InvalidInput(format!(
                "unknown notification type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Issue,
    Project,
    Client,
    Membership,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Issue => "issue",
            EntityKind::Project => "project",
            EntityKind::Client => "client",
            EntityKind::Membership => "membership",
        };
        f.write_str(s)
    }
}

/// What a notification relates to; `id` ends up as the notification's `related_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl EntityRef {
    pub fn issue(id: Uuid) -> Self {
        Self {
            kind: EntityKind::Issue,
            id,
        }
    }

    pub fn project(id: Uuid) -> Self {
        Self {
            kind: EntityKind::Project,
            id,
        }
    }

    pub fn client(id: Uuid) -> Self {
        Self {
            kind: EntityKind::Client,
            id,
        }
    }

    pub fn membership(id: Uuid) -> Self {
        Self {
            kind: EntityKind::Membership,
            id,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Persisted in-app notification. Only `read` (and with it `updated_at`) ever changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: UserId,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        related_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            notification_type,
            title: title.into(),
            message: message.into(),
            read: false,
            related_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: NotificationId) -> Self {
        self.id = id;
        self
    }

    /// Flips `read` to true. Returns false when it already was.
    pub fn mark_read(&mut self) -> bool {
        if self.read {
            return false;
        }
        self.read = true;
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_wire_format() {
        let user = Uuid::new_v4();
        let related = Uuid::new_v4();
        let n = Notification::new(user, NotificationType::Assignment, "t", "m", Some(related));
        let value = serde_json::to_value(&n).unwrap();

        assert_eq!(value["type"], "assignment");
        assert_eq!(value["user_id"], user.to_string());
        assert_eq!(value["related_id"], related.to_string());
        assert_eq!(value["read"], false);
        assert!(value.get("created_at").is_some());
        assert!(value.get("updated_at").is_some());
    }

    #[test]
    fn test_related_id_omitted_when_absent() {
        let n = Notification::new(Uuid::new_v4(), NotificationType::User, "t", "m", None);
        let value = serde_json::to_value(&n).unwrap();
        assert!(value.get("related_id").is_none());
    }

    #[test]
    fn test_mark_read_is_one_way() {
        let mut n = Notification::new(Uuid::new_v4(), NotificationType::Status, "t", "m", None);
        assert!(n.mark_read());
        assert!(!n.mark_read());
        assert!(n.read);
        assert!(n.updated_at >= n.created_at);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("team_lead".parse::<Role>().unwrap(), Role::TeamLead);
        assert!("owner".parse::<Role>().is_err());
        assert!(Role::Admin.is_privileged());
        assert!(Role::TeamLead.is_privileged());
        assert!(!Role::User.is_privileged());
    }

    #[test]
    fn test_notification_type_round_trips_through_str() {
        for t in [
            NotificationType::Comment,
            NotificationType::Assignment,
            NotificationType::Complete,
            NotificationType::User,
            NotificationType::Status,
        ] {
            assert_eq!(t.as_str().parse::<NotificationType>().unwrap(), t);
        }
    }
}

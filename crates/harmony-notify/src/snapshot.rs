//! Point-in-time copies of the entities the engine reasons about.
//!
//! Persistence lives elsewhere; handlers load these before and after a
//! mutation and hand them to the engine.

use chrono::{DateTime, Utc};
use harmony_core::{HarmonyError, Role, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueStatus {
    #[serde(rename = "todo")]
    Todo,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "review")]
    Review,
    #[serde(rename = "done")]
    Done,
}

impl IssueStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueStatus::Todo => "todo",
            IssueStatus::InProgress => "in-progress",
            IssueStatus::Review => "review",
            IssueStatus::Done => "done",
        }
    }

    /// Human readable label used in notification messages.
    pub fn label(self) -> &'static str {
        match self {
            IssueStatus::Todo => "To Do",
            IssueStatus::InProgress => "In Progress",
            IssueStatus::Review => "In Review",
            IssueStatus::Done => "Done",
        }
    }
}

impl Default for IssueStatus {
    fn default() -> Self {
        IssueStatus::Todo
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = HarmonyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(IssueStatus::Todo),
            "in-progress" => Ok(IssueStatus::InProgress),
            "review" => Ok(IssueStatus::Review),
            "done" => Ok(IssueStatus::Done),
            other => Err(HarmonyError::InvalidInput(format!(
                "unknown issue status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssuePriority {
    Low,
    Medium,
    High,
}

impl IssuePriority {
    pub fn as_str(self) -> &'static str {
        match self {
            IssuePriority::Low => "low",
            IssuePriority::Medium => "medium",
            IssuePriority::High => "high",
        }
    }
}

impl Default for IssuePriority {
    fn default() -> Self {
        IssuePriority::Medium
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueSnapshot {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: IssueStatus,
    #[serde(default)]
    pub priority: IssuePriority,
    pub created_by: UserId,
    #[serde(default)]
    pub assigned_to: Option<UserId>,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl IssueSnapshot {
    pub fn new(title: impl Into<String>, created_by: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            status: IssueStatus::default(),
            priority: IssuePriority::default(),
            created_by,
            assigned_to: None,
            project_id: None,
            start_date: None,
            due_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Percent complete, 0..=100.
    #[serde(default)]
    pub progress: i32,
    #[serde(default)]
    pub status: String,
    pub created_by: UserId,
    #[serde(default)]
    pub members: Vec<UserId>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

impl ProjectSnapshot {
    pub fn new(name: impl Into<String>, created_by: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            progress: 0,
            status: "planning".to_string(),
            created_by,
            members: Vec::new(),
            start_date: None,
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSnapshot {
    pub id: Uuid,
    pub name: String,
    pub created_by: UserId,
}

impl ClientSnapshot {
    pub fn new(name: impl Into<String>, created_by: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl From<&harmony_core::User> for UserSnapshot {
    fn from(user: &harmony_core::User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            avatar: None,
        }
    }
}

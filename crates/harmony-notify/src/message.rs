//! Message taxonomy: the title/body of each in-app notification and the
//! email category that accompanies it.

use crate::event::{ChangeEvent, EventKind};
use crate::resolver::Rule;
use crate::roster::RoleRoster;
use harmony_core::{EmailGateway, EntityKind, NotificationId, Result};
use uuid::Uuid;

/// Name used when the actor cannot be found in the roster.
pub const FALLBACK_ACTOR_NAME: &str = "System";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub title: String,
    pub body: String,
}

/// The templated email sent next to (or instead of) an in-app notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailMessage {
    IssueCreated {
        title: String,
        issue_id: Uuid,
    },
    IssueUpdated {
        title: String,
        issue_id: Uuid,
        changes: Vec<String>,
    },
    IssueAssigned {
        title: String,
        issue_id: Uuid,
        assigner: String,
    },
    ProjectCreated {
        name: String,
        project_id: Uuid,
    },
    ProjectUpdated {
        name: String,
        project_id: Uuid,
        changes: Vec<String>,
    },
    Notification {
        title: String,
        message: String,
        notification_id: NotificationId,
    },
    AccountCreated {
        name: String,
        password: String,
    },
    AccountUpdated {
        name: String,
        changes: Vec<String>,
    },
    AccountDeleted {
        name: String,
    },
}

impl EmailMessage {
    pub fn category(&self) -> &'static str {
        match self {
            EmailMessage::IssueCreated { .. } => "issue_created",
            EmailMessage::IssueUpdated { .. } => "issue_updated",
            EmailMessage::IssueAssigned { .. } => "issue_assigned",
            EmailMessage::ProjectCreated { .. } => "project_created",
            EmailMessage::ProjectUpdated { .. } => "project_updated",
            EmailMessage::Notification { .. } => "notification",
            EmailMessage::AccountCreated { .. } => "user_created",
            EmailMessage::AccountUpdated { .. } => "user_updated",
            EmailMessage::AccountDeleted { .. } => "user_deleted",
        }
    }

    pub async fn send(&self, gateway: &dyn EmailGateway, to: &str) -> Result<()> {
        match self {
            EmailMessage::IssueCreated { title, issue_id } => {
                gateway.send_issue_created(to, title, *issue_id).await
            }
            EmailMessage::IssueUpdated {
                title,
                issue_id,
                changes,
            } => gateway.send_issue_updated(to, title, *issue_id, changes).await,
            EmailMessage::IssueAssigned {
                title,
                issue_id,
                assigner,
            } => gateway.send_issue_assigned(to, title, *issue_id, assigner).await,
            EmailMessage::ProjectCreated { name, project_id } => {
                gateway.send_project_created(to, name, *project_id).await
            }
            EmailMessage::ProjectUpdated {
                name,
                project_id,
                changes,
            } => {
                gateway
                    .send_project_updated(to, name, *project_id, changes)
                    .await
            }
            EmailMessage::Notification {
                title,
                message,
                notification_id,
            } => {
                gateway
                    .send_notification(to, title, message, *notification_id)
                    .await
            }
            EmailMessage::AccountCreated { name, password } => {
                gateway.send_user_created(to, name, password).await
            }
            EmailMessage::AccountUpdated { name, changes } => {
                gateway.send_user_updated(to, name, changes).await
            }
            EmailMessage::AccountDeleted { name } => gateway.send_user_deleted(to, name).await,
        }
    }
}

fn noun(kind: EntityKind) -> (&'static str, &'static str) {
    match kind {
        EntityKind::Issue => ("issue", "Issue"),
        EntityKind::Project | EntityKind::Membership => ("project", "Project"),
        EntityKind::Client => ("client", "Client"),
    }
}

pub fn actor_name<'a>(event: &ChangeEvent, roster: &'a RoleRoster) -> &'a str {
    roster
        .name_of(event.actor())
        .unwrap_or(FALLBACK_ACTOR_NAME)
}

/// In-app title and body for the recipients selected by `rule`.
pub fn compose(event: &ChangeEvent, rule: Rule, roster: &RoleRoster) -> Message {
    let actor = actor_name(event, roster);
    let subject = event.subject();
    let (lower, upper) = noun(event.entity_kind());

    let (title, body) = match rule {
        Rule::CreationBroadcast => (
            format!("New {} created: {}", lower, subject),
            format!("{} created a new {}: \"{}\"", actor, lower, subject),
        ),
        Rule::ProjectMembers => (
            format!("New issue in project: {}", subject),
            format!(
                "{} created the issue \"{}\" in one of your projects",
                actor, subject
            ),
        ),
        Rule::Assignment => (
            format!("Issue assigned: {}", subject),
            format!("{} assigned you the issue \"{}\"", actor, subject),
        ),
        Rule::Membership => (
            "You have been added to a project".to_string(),
            format!("{} added you to the project \"{}\"", actor, subject),
        ),
        Rule::Stakeholders => match event.kind() {
            EventKind::StatusChanged => {
                let status = event
                    .snapshot()
                    .new_status
                    .map(|s| s.label())
                    .unwrap_or("unknown");
                (
                    format!("{} status updated: {}", upper, subject),
                    format!("{} changed the {} status to: {}", actor, lower, status),
                )
            }
            _ => (
                format!("{} updated: {}", upper, subject),
                format!(
                    "{} updated the {}: {}",
                    actor,
                    lower,
                    event.change_tags().join(", ")
                ),
            ),
        },
    };

    Message { title, body }
}

/// Email to send to one recipient of `rule`.
pub fn email_for(
    event: &ChangeEvent,
    rule: Rule,
    message: &Message,
    notification_id: NotificationId,
    roster: &RoleRoster,
) -> EmailMessage {
    let subject = event.subject().to_string();
    let id = event.entity().id;

    match (rule, event.entity_kind()) {
        (Rule::Assignment, EntityKind::Issue) => EmailMessage::IssueAssigned {
            title: subject,
            issue_id: id,
            assigner: actor_name(event, roster).to_string(),
        },
        (Rule::CreationBroadcast | Rule::ProjectMembers, EntityKind::Issue) => {
            EmailMessage::IssueCreated {
                title: subject,
                issue_id: id,
            }
        }
        (Rule::CreationBroadcast, EntityKind::Project) => EmailMessage::ProjectCreated {
            name: subject,
            project_id: id,
        },
        (Rule::Stakeholders, EntityKind::Issue) => EmailMessage::IssueUpdated {
            title: subject,
            issue_id: id,
            changes: event.change_tags().to_vec(),
        },
        (Rule::Stakeholders, EntityKind::Project) => EmailMessage::ProjectUpdated {
            name: subject,
            project_id: id,
            changes: event.change_tags().to_vec(),
        },
        _ => EmailMessage::Notification {
            title: message.title.clone(),
            message: message.body.clone(),
            notification_id,
        },
    }
}

use crate::snapshot::{ClientSnapshot, IssueSnapshot, IssueStatus, ProjectSnapshot};
use harmony_core::{EntityKind, EntityRef, UserId};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    Updated,
    StatusChanged,
    Assigned,
    MemberAdded,
}

impl EventKind {
    /// Content changes are only worth a notification when something changed.
    pub fn requires_change_tags(self) -> bool {
        matches!(self, EventKind::Updated | EventKind::StatusChanged)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Created => "created",
            EventKind::Updated => "updated",
            EventKind::StatusChanged => "status_changed",
            EventKind::Assigned => "assigned",
            EventKind::MemberAdded => "member_added",
        };
        f.write_str(s)
    }
}

/// The parts of the entity the resolver and the message taxonomy look at.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventSnapshot {
    /// Display title: issue title, project or client name.
    pub subject: String,
    pub creator: Option<UserId>,
    pub assignee: Option<UserId>,
    pub project_members: Vec<UserId>,
    pub old_assignee: Option<UserId>,
    pub old_status: Option<IssueStatus>,
    pub new_status: Option<IssueStatus>,
}

impl From<&IssueSnapshot> for EventSnapshot {
    fn from(issue: &IssueSnapshot) -> Self {
        Self {
            subject: issue.title.clone(),
            creator: Some(issue.created_by),
            assignee: issue.assigned_to,
            new_status: Some(issue.status),
            ..Self::default()
        }
    }
}

impl From<&ProjectSnapshot> for EventSnapshot {
    fn from(project: &ProjectSnapshot) -> Self {
        Self {
            subject: project.name.clone(),
            creator: Some(project.created_by),
            project_members: project.members.clone(),
            ..Self::default()
        }
    }
}

impl From<&ClientSnapshot> for EventSnapshot {
    fn from(client: &ClientSnapshot) -> Self {
        Self {
            subject: client.name.clone(),
            creator: Some(client.created_by),
            ..Self::default()
        }
    }
}

/// One mutation, as seen by the fan-out engine.
///
/// Built through the per-kind constructors and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    kind: EventKind,
    actor: UserId,
    entity: EntityRef,
    change_tags: Vec<String>,
    snapshot: EventSnapshot,
}

impl ChangeEvent {
    pub fn created(actor: UserId, entity: EntityRef, snapshot: EventSnapshot) -> Self {
        Self {
            kind: EventKind::Created,
            actor,
            entity,
            change_tags: Vec::new(),
            snapshot,
        }
    }

    pub fn updated(
        actor: UserId,
        entity: EntityRef,
        change_tags: Vec<String>,
        snapshot: EventSnapshot,
    ) -> Self {
        Self {
            kind: EventKind::Updated,
            actor,
            entity,
            change_tags,
            snapshot,
        }
    }

    /// A status transition. Carries the single tag "status updated" unless
    /// `old == new`, in which case the event has no tags and is skipped.
    pub fn status_changed(
        actor: UserId,
        entity: EntityRef,
        old: IssueStatus,
        new: IssueStatus,
        mut snapshot: EventSnapshot,
    ) -> Self {
        snapshot.old_status = Some(old);
        snapshot.new_status = Some(new);
        let change_tags = if old == new {
            Vec::new()
        } else {
            vec!["status updated".to_string()]
        };
        Self {
            kind: EventKind::StatusChanged,
            actor,
            entity,
            change_tags,
            snapshot,
        }
    }

    pub fn assigned(
        actor: UserId,
        entity: EntityRef,
        old_assignee: Option<UserId>,
        new_assignee: UserId,
        mut snapshot: EventSnapshot,
    ) -> Self {
        snapshot.old_assignee = old_assignee;
        snapshot.assignee = Some(new_assignee);
        Self {
            kind: EventKind::Assigned,
            actor,
            entity,
            change_tags: Vec::new(),
            snapshot,
        }
    }

    /// `member` joined the project `project_id`; the notification relates to the project.
    pub fn member_added(
        actor: UserId,
        project_id: Uuid,
        project_name: impl Into<String>,
        member: UserId,
    ) -> Self {
        Self {
            kind: EventKind::MemberAdded,
            actor,
            entity: EntityRef::membership(project_id),
            change_tags: Vec::new(),
            snapshot: EventSnapshot {
                subject: project_name.into(),
                project_members: vec![member],
                ..EventSnapshot::default()
            },
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn actor(&self) -> UserId {
        self.actor
    }

    pub fn entity(&self) -> EntityRef {
        self.entity
    }

    pub fn entity_kind(&self) -> EntityKind {
        self.entity.kind
    }

    pub fn change_tags(&self) -> &[String] {
        &self.change_tags
    }

    pub fn snapshot(&self) -> &EventSnapshot {
        &self.snapshot
    }

    pub fn subject(&self) -> &str {
        &self.snapshot.subject
    }

    /// The user a `MemberAdded` event is about.
    pub fn added_member(&self) -> Option<UserId> {
        match self.kind {
            EventKind::MemberAdded => self.snapshot.project_members.first().copied(),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.entity, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_changed_tags() {
        let issue = IssueSnapshot::new("Ship it", Uuid::new_v4());
        let entity = EntityRef::issue(issue.id);

        let changed = ChangeEvent::status_changed(
            Uuid::new_v4(),
            entity,
            IssueStatus::Todo,
            IssueStatus::Done,
            EventSnapshot::from(&issue),
        );
        assert_eq!(changed.change_tags(), ["status updated"]);
        assert_eq!(changed.snapshot().new_status, Some(IssueStatus::Done));

        let same = ChangeEvent::status_changed(
            Uuid::new_v4(),
            entity,
            IssueStatus::Review,
            IssueStatus::Review,
            EventSnapshot::from(&issue),
        );
        assert!(same.change_tags().is_empty());
    }

    #[test]
    fn test_member_added_relates_to_project() {
        let project = Uuid::new_v4();
        let member = Uuid::new_v4();
        let event = ChangeEvent::member_added(Uuid::new_v4(), project, "Apollo", member);
        assert_eq!(event.entity().id, project);
        assert_eq!(event.entity_kind(), EntityKind::Membership);
        assert_eq!(event.added_member(), Some(member));
        assert_eq!(event.subject(), "Apollo");
    }

    #[test]
    fn test_requires_change_tags() {
        assert!(EventKind::Updated.requires_change_tags());
        assert!(EventKind::StatusChanged.requires_change_tags());
        assert!(!EventKind::Assigned.requires_change_tags());
        assert!(!EventKind::MemberAdded.requires_change_tags());
        assert!(!EventKind::Created.requires_change_tags());
    }
}

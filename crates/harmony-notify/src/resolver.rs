//! Recipient Resolver: who hears about an event, and under which notification type.
//!
//! Resolution is a pure function of the event and a [`RoleRoster`]; the
//! roster is fetched by the caller so the rules can be exercised without any
//! collaborator.

use crate::error::ResolveError;
use crate::event::{ChangeEvent, EventKind};
use crate::roster::RoleRoster;
use harmony_core::{EntityKind, NotificationType, Role, UserId};
use serde::Serialize;
use std::collections::BTreeSet;

/// The rule that selected a group of recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Admins and team leads hear about every new issue, project and client.
    CreationBroadcast,
    /// Members of the project a new issue was filed under.
    ProjectMembers,
    Assignment,
    Membership,
    /// Creator, assignee or project members, and (for regular-user actors) admins and team leads.
    Stakeholders,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub rule: Rule,
    pub notification_type: NotificationType,
    pub recipients: BTreeSet<UserId>,
}

/// Deliveries in rule order. A user selected by two rules appears in both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub deliveries: Vec<Delivery>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.deliveries.iter().all(|d| d.recipients.is_empty())
    }

    /// Number of (rule, recipient) pairs, i.e. notifications to persist.
    pub fn notification_count(&self) -> usize {
        self.deliveries.iter().map(|d| d.recipients.len()).sum()
    }

    /// Every user selected by any rule.
    pub fn recipients(&self) -> BTreeSet<UserId> {
        self.deliveries
            .iter()
            .flat_map(|d| d.recipients.iter().copied())
            .collect()
    }

    pub fn recipients_of(&self, notification_type: NotificationType) -> BTreeSet<UserId> {
        self.deliveries
            .iter()
            .filter(|d| d.notification_type == notification_type)
            .flat_map(|d| d.recipients.iter().copied())
            .collect()
    }

    fn push(&mut self, rule: Rule, notification_type: NotificationType, recipients: BTreeSet<UserId>) {
        if !recipients.is_empty() {
            self.deliveries.push(Delivery {
                rule,
                notification_type,
                recipients,
            });
        }
    }
}

pub fn resolve(event: &ChangeEvent, roster: &RoleRoster) -> Result<Resolution, ResolveError> {
    let actor = event.actor();
    let snapshot = event.snapshot();
    let mut resolution = Resolution::default();

    match event.kind() {
        EventKind::Created => {
            let mut broadcast = roster.privileged();
            broadcast.remove(&actor);
            resolution.push(Rule::CreationBroadcast, NotificationType::Status, broadcast);

            if event.entity_kind() == EntityKind::Issue {
                let members = others(snapshot.project_members.iter().copied(), actor);
                resolution.push(Rule::ProjectMembers, NotificationType::Status, members);
            }
        }
        EventKind::Assigned => {
            let assignee = snapshot.assignee.ok_or(ResolveError::MissingEntityData {
                event: "assigned",
                field: "assignee",
            })?;
            if snapshot.old_assignee != Some(assignee) && assignee != actor {
                resolution.push(
                    Rule::Assignment,
                    NotificationType::Assignment,
                    BTreeSet::from([assignee]),
                );
            }
        }
        EventKind::MemberAdded => {
            let member = event.added_member().ok_or(ResolveError::MissingEntityData {
                event: "member_added",
                field: "member",
            })?;
            if member != actor {
                resolution.push(Rule::Membership, NotificationType::User, BTreeSet::from([member]));
            }
        }
        EventKind::Updated | EventKind::StatusChanged => {
            if event.change_tags().is_empty() {
                return Ok(resolution);
            }
            let actor_role = roster
                .role_of(actor)
                .ok_or(ResolveError::UnknownActor(actor))?;

            let mut recipients = BTreeSet::new();
            if let Some(creator) = snapshot.creator.filter(|c| *c != actor) {
                recipients.insert(creator);
            }

            let followers: Vec<UserId> = match event.entity_kind() {
                EntityKind::Issue => snapshot.assignee.into_iter().collect(),
                EntityKind::Project => snapshot.project_members.clone(),
                EntityKind::Client | EntityKind::Membership => Vec::new(),
            };
            recipients.extend(
                followers
                    .into_iter()
                    .filter(|u| *u != actor && Some(*u) != snapshot.creator),
            );

            if actor_role == Role::User {
                recipients.extend(others(roster.privileged(), actor));
            }

            resolution.push(Rule::Stakeholders, NotificationType::Status, recipients);
        }
    }

    Ok(resolution)
}

fn others(users: impl IntoIterator<Item = UserId>, actor: UserId) -> BTreeSet<UserId> {
    users.into_iter().filter(|u| *u != actor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventSnapshot;
    use crate::snapshot::{IssueSnapshot, IssueStatus, ProjectSnapshot};
    use harmony_core::{EntityRef, User};
    use uuid::Uuid;

    struct Team {
        admin: User,
        lead: User,
        alice: User,
        bob: User,
        carol: User,
    }

    impl Team {
        fn new() -> Self {
            Self {
                admin: User::new("Ada", "ada@example.com", Role::Admin),
                lead: User::new("Lin", "lin@example.com", Role::TeamLead),
                alice: User::new("Alice", "alice@example.com", Role::User),
                bob: User::new("Bob", "bob@example.com", Role::User),
                carol: User::new("Carol", "carol@example.com", Role::User),
            }
        }

        fn roster(&self) -> RoleRoster {
            RoleRoster::new(vec![
                self.admin.clone(),
                self.lead.clone(),
                self.alice.clone(),
                self.bob.clone(),
                self.carol.clone(),
            ])
        }
    }

    fn tags(t: &[&str]) -> Vec<String> {
        t.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_created_broadcasts_to_privileged_minus_actor() {
        let team = Team::new();
        let project = ProjectSnapshot::new("Apollo", team.admin.id);
        let event = ChangeEvent::created(
            team.admin.id,
            EntityRef::project(project.id),
            EventSnapshot::from(&project),
        );

        let resolution = resolve(&event, &team.roster()).unwrap();
        assert_eq!(resolution.deliveries.len(), 1);
        let delivery = &resolution.deliveries[0];
        assert_eq!(delivery.rule, Rule::CreationBroadcast);
        assert_eq!(delivery.notification_type, NotificationType::Status);
        assert_eq!(delivery.recipients, BTreeSet::from([team.lead.id]));
    }

    #[test]
    fn test_issue_created_in_project_notifies_members() {
        let team = Team::new();
        let mut issue = IssueSnapshot::new("Login bug", team.alice.id);
        issue.project_id = Some(Uuid::new_v4());
        let mut snapshot = EventSnapshot::from(&issue);
        snapshot.project_members = vec![team.alice.id, team.carol.id];

        let event = ChangeEvent::created(team.alice.id, EntityRef::issue(issue.id), snapshot);
        let resolution = resolve(&event, &team.roster()).unwrap();

        assert_eq!(resolution.deliveries.len(), 2);
        assert_eq!(resolution.deliveries[1].rule, Rule::ProjectMembers);
        assert_eq!(
            resolution.deliveries[1].recipients,
            BTreeSet::from([team.carol.id])
        );
        assert!(!resolution.recipients().contains(&team.alice.id));
    }

    #[test]
    fn test_assignment_to_self_is_silent() {
        let team = Team::new();
        let issue = IssueSnapshot::new("Docs", team.bob.id);
        let event = ChangeEvent::assigned(
            team.bob.id,
            EntityRef::issue(issue.id),
            None,
            team.bob.id,
            EventSnapshot::from(&issue),
        );
        assert!(resolve(&event, &team.roster()).unwrap().is_empty());
    }

    #[test]
    fn test_reassignment_to_same_user_is_silent() {
        let team = Team::new();
        let issue = IssueSnapshot::new("Docs", team.bob.id);
        let event = ChangeEvent::assigned(
            team.admin.id,
            EntityRef::issue(issue.id),
            Some(team.carol.id),
            team.carol.id,
            EventSnapshot::from(&issue),
        );
        assert!(resolve(&event, &team.roster()).unwrap().is_empty());
    }

    #[test]
    fn test_assignment_notifies_new_assignee() {
        let team = Team::new();
        let issue = IssueSnapshot::new("Docs", team.bob.id);
        let event = ChangeEvent::assigned(
            team.bob.id,
            EntityRef::issue(issue.id),
            Some(team.alice.id),
            team.carol.id,
            EventSnapshot::from(&issue),
        );
        let resolution = resolve(&event, &team.roster()).unwrap();
        assert_eq!(
            resolution.recipients_of(NotificationType::Assignment),
            BTreeSet::from([team.carol.id])
        );
        assert_eq!(resolution.notification_count(), 1);
    }

    #[test]
    fn test_member_added() {
        let team = Team::new();
        let event = ChangeEvent::member_added(team.lead.id, Uuid::new_v4(), "Apollo", team.bob.id);
        let resolution = resolve(&event, &team.roster()).unwrap();
        assert_eq!(resolution.deliveries[0].rule, Rule::Membership);
        assert_eq!(resolution.deliveries[0].notification_type, NotificationType::User);
        assert_eq!(resolution.deliveries[0].recipients, BTreeSet::from([team.bob.id]));

        let own = ChangeEvent::member_added(team.bob.id, Uuid::new_v4(), "Apollo", team.bob.id);
        assert!(resolve(&own, &team.roster()).unwrap().is_empty());
    }

    #[test]
    fn test_update_by_regular_user_includes_privileged() {
        let team = Team::new();
        let mut issue = IssueSnapshot::new("Docs", team.bob.id);
        issue.assigned_to = Some(team.carol.id);
        let event = ChangeEvent::updated(
            team.alice.id,
            EntityRef::issue(issue.id),
            tags(&["title updated"]),
            EventSnapshot::from(&issue),
        );
        let resolution = resolve(&event, &team.roster()).unwrap();
        assert_eq!(
            resolution.recipients(),
            BTreeSet::from([team.bob.id, team.carol.id, team.admin.id, team.lead.id])
        );
        assert_eq!(resolution.deliveries.len(), 1);
    }

    #[test]
    fn test_update_by_privileged_actor_skips_broadcast() {
        let team = Team::new();
        let mut issue = IssueSnapshot::new("Docs", team.bob.id);
        issue.assigned_to = Some(team.carol.id);
        let event = ChangeEvent::status_changed(
            team.lead.id,
            EntityRef::issue(issue.id),
            IssueStatus::Todo,
            IssueStatus::Done,
            EventSnapshot::from(&issue),
        );
        let resolution = resolve(&event, &team.roster()).unwrap();
        assert_eq!(
            resolution.recipients(),
            BTreeSet::from([team.bob.id, team.carol.id])
        );
    }

    #[test]
    fn test_creator_who_is_assignee_is_notified_once() {
        let team = Team::new();
        let mut issue = IssueSnapshot::new("Docs", team.bob.id);
        issue.assigned_to = Some(team.bob.id);
        let event = ChangeEvent::updated(
            team.admin.id,
            EntityRef::issue(issue.id),
            tags(&["priority updated"]),
            EventSnapshot::from(&issue),
        );
        let resolution = resolve(&event, &team.roster()).unwrap();
        assert_eq!(resolution.notification_count(), 1);
    }

    #[test]
    fn test_project_update_reaches_members() {
        let team = Team::new();
        let mut project = ProjectSnapshot::new("Apollo", team.alice.id);
        project.members = vec![team.alice.id, team.bob.id, team.carol.id];
        let event = ChangeEvent::updated(
            team.admin.id,
            EntityRef::project(project.id),
            tags(&["progress updated"]),
            EventSnapshot::from(&project),
        );
        let resolution = resolve(&event, &team.roster()).unwrap();
        assert_eq!(
            resolution.recipients(),
            BTreeSet::from([team.alice.id, team.bob.id, team.carol.id])
        );
    }

    #[test]
    fn test_update_without_tags_resolves_to_nothing() {
        let team = Team::new();
        let issue = IssueSnapshot::new("Docs", team.bob.id);
        let event = ChangeEvent::updated(
            team.alice.id,
            EntityRef::issue(issue.id),
            Vec::new(),
            EventSnapshot::from(&issue),
        );
        assert!(resolve(&event, &team.roster()).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_actor_aborts_update() {
        let team = Team::new();
        let issue = IssueSnapshot::new("Docs", team.bob.id);
        let stranger = Uuid::new_v4();
        let event = ChangeEvent::updated(
            stranger,
            EntityRef::issue(issue.id),
            tags(&["title updated"]),
            EventSnapshot::from(&issue),
        );
        let err = resolve(&event, &team.roster()).unwrap_err();
        assert!(matches!(err, ResolveError::UnknownActor(id) if id == stranger));
    }
}

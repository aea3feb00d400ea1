use harmony_core::{
    EntityRef, Notification, NotificationStore, NotificationType, Role, User, UserId,
};
use harmony_notify::{
    resolve, ChangeEvent, EventKind, EventSnapshot, IssueStatus, RoleRoster, Rule,
};
use harmony_store::InMemoryNotificationStore;
use proptest::prelude::*;
use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Scenario {
    users: Vec<User>,
    actor: usize,
    creator: usize,
    assignee: Option<usize>,
    old_assignee: Option<usize>,
    members: Vec<usize>,
    kind: EventKind,
    on_project: bool,
}

impl Scenario {
    fn id(&self, idx: usize) -> UserId {
        self.users[idx].id
    }

    fn actor_id(&self) -> UserId {
        self.id(self.actor)
    }

    fn roster(&self) -> RoleRoster {
        RoleRoster::new(self.users.clone())
    }

    fn privileged(&self) -> BTreeSet<UserId> {
        self.users
            .iter()
            .filter(|u| u.role.is_privileged())
            .map(|u| u.id)
            .collect()
    }

    fn entity(&self) -> EntityRef {
        if self.on_project {
            EntityRef::project(Uuid::new_v4())
        } else {
            EntityRef::issue(Uuid::new_v4())
        }
    }

    fn snapshot(&self) -> EventSnapshot {
        EventSnapshot {
            subject: "subject".to_string(),
            creator: Some(self.id(self.creator)),
            assignee: self.assignee.map(|i| self.id(i)),
            project_members: self.members.iter().map(|i| self.id(*i)).collect(),
            ..EventSnapshot::default()
        }
    }

    /// Creator plus assignee (issues) or members (projects).
    fn stakeholders(&self) -> BTreeSet<UserId> {
        let snapshot = self.snapshot();
        let mut set: BTreeSet<UserId> = snapshot.creator.into_iter().collect();
        if self.on_project {
            set.extend(snapshot.project_members);
        } else {
            set.extend(snapshot.assignee);
        }
        set
    }

    fn with_actor_role(mut self, role: Role) -> Self {
        self.users[self.actor].role = role;
        self
    }

    fn new_assignee(&self) -> UserId {
        self.id(self.assignee.unwrap_or(self.creator))
    }

    fn event(&self) -> ChangeEvent {
        let actor = self.actor_id();
        match self.kind {
            EventKind::Created => ChangeEvent::created(actor, self.entity(), self.snapshot()),
            EventKind::Updated => ChangeEvent::updated(
                actor,
                self.entity(),
                vec!["description updated".to_string()],
                self.snapshot(),
            ),
            EventKind::StatusChanged => ChangeEvent::status_changed(
                actor,
                self.entity(),
                IssueStatus::Todo,
                IssueStatus::Review,
                self.snapshot(),
            ),
            EventKind::Assigned => ChangeEvent::assigned(
                actor,
                EntityRef::issue(Uuid::new_v4()),
                self.old_assignee.map(|i| self.id(i)),
                self.new_assignee(),
                self.snapshot(),
            ),
            EventKind::MemberAdded => ChangeEvent::member_added(
                actor,
                Uuid::new_v4(),
                "project",
                self.id(self.members.first().copied().unwrap_or(self.creator)),
            ),
        }
    }
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::User), Just(Role::TeamLead), Just(Role::Admin)]
}

fn arb_kind() -> impl Strategy<Value = EventKind> + Clone {
    prop_oneof![
        Just(EventKind::Created),
        Just(EventKind::Updated),
        Just(EventKind::StatusChanged),
        Just(EventKind::Assigned),
        Just(EventKind::MemberAdded),
    ]
}

fn arb_update_kind() -> impl Strategy<Value = EventKind> + Clone {
    prop_oneof![Just(EventKind::Updated), Just(EventKind::StatusChanged)]
}

fn arb_scenario() -> impl Strategy<Value = Scenario> {
    arb_scenario_of(arb_kind())
}

fn arb_scenario_of(
    kind: impl Strategy<Value = EventKind> + Clone,
) -> impl Strategy<Value = Scenario> {
    prop::collection::vec(arb_role(), 1..8).prop_flat_map(move |roles| {
        let n = roles.len();
        (
            Just(roles),
            0..n,
            0..n,
            prop::option::of(0..n),
            prop::option::of(0..n),
            prop::collection::vec(0..n, 0..=n),
            kind.clone(),
            any::<bool>(),
        )
            .prop_map(
                |(roles, actor, creator, assignee, old_assignee, members, kind, on_project)| {
                    let users = roles
                        .into_iter()
                        .enumerate()
                        .map(|(i, role)| {
                            User::new(format!("user{}", i), format!("u{}@example.com", i), role)
                        })
                        .collect();
                    Scenario {
                        users,
                        actor,
                        creator,
                        assignee,
                        old_assignee,
                        members,
                        kind,
                        on_project,
                    }
                },
            )
    })
}

proptest! {
    #[test]
    fn prop_actor_never_notified(s in arb_scenario()) {
        let resolution = resolve(&s.event(), &s.roster()).unwrap();
        prop_assert!(!resolution.recipients().contains(&s.actor_id()));
    }

    #[test]
    fn prop_privileged_actor_does_not_broadcast(
        s in arb_scenario_of(arb_update_kind()),
        role in prop_oneof![Just(Role::Admin), Just(Role::TeamLead)],
    ) {
        let s = s.with_actor_role(role);

        let resolution = resolve(&s.event(), &s.roster()).unwrap();
        let stakeholders = s.stakeholders();
        // Privileged users only hear about it when they are a stakeholder themselves.
        for user in resolution.recipients().intersection(&s.privileged()) {
            prop_assert!(stakeholders.contains(user));
        }
    }

    #[test]
    fn prop_regular_actor_broadcasts_to_every_privileged_user(s in arb_scenario_of(arb_update_kind())) {
        let s = s.with_actor_role(Role::User);

        let recipients = resolve(&s.event(), &s.roster()).unwrap().recipients();
        for user in s.privileged() {
            prop_assert!(recipients.contains(&user));
        }
    }

    #[test]
    fn prop_creation_broadcast_is_privileged_minus_actor(s in arb_scenario_of(Just(EventKind::Created))) {
        let resolution = resolve(&s.event(), &s.roster()).unwrap();
        let mut expected = s.privileged();
        expected.remove(&s.actor_id());

        let broadcast: BTreeSet<UserId> = resolution
            .deliveries
            .iter()
            .filter(|d| d.rule == Rule::CreationBroadcast)
            .inspect(|d| assert_eq!(d.notification_type, NotificationType::Status))
            .flat_map(|d| d.recipients.iter().copied())
            .collect();
        prop_assert_eq!(broadcast, expected);
    }

    #[test]
    fn prop_assignment_has_at_most_the_new_assignee(s in arb_scenario_of(Just(EventKind::Assigned))) {
        let resolution = resolve(&s.event(), &s.roster()).unwrap();
        let assignee = s.new_assignee();
        let unchanged = s.old_assignee.map(|i| s.id(i)) == Some(assignee);

        let expected: BTreeSet<UserId> = if assignee == s.actor_id() || unchanged {
            BTreeSet::new()
        } else {
            BTreeSet::from([assignee])
        };
        prop_assert_eq!(resolution.recipients_of(NotificationType::Assignment), expected.clone());
        prop_assert_eq!(resolution.notification_count(), expected.len());
    }

    #[test]
    fn prop_mark_all_read_empties_unread(reads in prop::collection::vec(any::<bool>(), 0..12)) {
        let store = InMemoryNotificationStore::new();
        let user = Uuid::new_v4();
        tokio_test::block_on(async {
            for (i, read) in reads.iter().enumerate() {
                let mut n = Notification::new(user, NotificationType::Status, format!("n{}", i), "m", None);
                n.read = *read;
                store.create(n).await.unwrap();
            }

            store.mark_all_as_read(user).await.unwrap();
            assert!(store.get_unread_by_user(user).await.unwrap().is_empty());
            store.mark_all_as_read(user).await.unwrap();
            assert!(store.get_unread_by_user(user).await.unwrap().is_empty());
            assert_eq!(store.get_by_user(user).await.unwrap().len(), reads.len());
        });
    }

    #[test]
    fn prop_mark_one_read_leaves_others(count in 1usize..10, pick in any::<prop::sample::Index>()) {
        let store = InMemoryNotificationStore::new();
        let user = Uuid::new_v4();
        tokio_test::block_on(async {
            let mut ids = Vec::new();
            for i in 0..count {
                let n = Notification::new(user, NotificationType::Assignment, format!("n{}", i), "m", None);
                ids.push(n.id);
                store.create(n).await.unwrap();
            }
            let target = ids[pick.index(count)];

            store.mark_as_read(target).await.unwrap();
            for n in store.get_by_user(user).await.unwrap() {
                assert_eq!(n.read, n.id == target);
            }
        });
    }
}

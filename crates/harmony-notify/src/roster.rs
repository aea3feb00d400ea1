use harmony_core::{Result, Role, User, UserDirectory, UserId};
use std::collections::{BTreeSet, HashMap};

/// Read-only view of every user and their role, taken once per event.
#[derive(Debug, Clone, Default)]
pub struct RoleRoster {
    users: HashMap<UserId, Member>,
}

#[derive(Debug, Clone)]
struct Member {
    name: String,
    role: Role,
}

impl RoleRoster {
    pub fn new(users: impl IntoIterator<Item = User>) -> Self {
        let users = users
            .into_iter()
            .map(|u| {
                (
                    u.id,
                    Member {
                        name: u.name,
                        role: u.role,
                    },
                )
            })
            .collect();
        Self { users }
    }

    pub async fn load(directory: &dyn UserDirectory) -> Result<Self> {
        Ok(Self::new(directory.get_all().await?))
    }

    pub fn role_of(&self, user: UserId) -> Option<Role> {
        self.users.get(&user).map(|m| m.role)
    }

    pub fn name_of(&self, user: UserId) -> Option<&str> {
        self.users.get(&user).map(|m| m.name.as_str())
    }

    /// Admins and team leads.
    pub fn privileged(&self) -> BTreeSet<UserId> {
        self.users
            .iter()
            .filter(|(_, m)| m.role.is_privileged())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

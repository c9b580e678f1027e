use warden_core::{RoleId, UserId};

use crate::Role;

/// Anything that can hold a grant in a protection set.
///
/// Both variants are plain snowflakes on disk; the variant is recovered
/// when the policy is loaded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Principal {
    User(UserId),
    Role(RoleId),
}

impl Principal {
    /// Raw numeric id, as persisted.
    pub fn raw_id(&self) -> u64 {
        match self {
            Principal::User(id) => id.get(),
            Principal::Role(id) => id.get(),
        }
    }
}

impl core::fmt::Display for Principal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Principal::User(id) => write!(f, "<@{id}>"),
            Principal::Role(id) => write!(f, "<@&{id}>"),
        }
    }
}

impl From<UserId> for Principal {
    fn from(value: UserId) -> Self {
        Principal::User(value)
    }
}

impl From<RoleId> for Principal {
    fn from(value: RoleId) -> Self {
        Principal::Role(value)
    }
}

/// The user invoking a command, with the roles they hold in the current
/// workspace (empty outside a workspace).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl Invoker {
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    pub fn has_role_id(&self, role_id: RoleId) -> bool {
        self.roles.iter().any(|r| r.id == role_id)
    }

    pub fn has_role_named(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }
}

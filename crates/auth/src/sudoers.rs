use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use warden_core::UserId;

/// Bot-wide set of users with elevated authorization.
///
/// Cloning shares the underlying set; the router hands one clone to every
/// tenant context.
#[derive(Debug, Clone, Default)]
pub struct SudoerSet {
    inner: Arc<RwLock<BTreeSet<UserId>>>,
}

impl SudoerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_users(users: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(users.into_iter().collect())),
        }
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&user)
    }

    /// Returns `true` if the user was not already a sudoer.
    pub fn insert(&self, user: UserId) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user)
    }

    /// Returns `true` if the user was a sudoer.
    pub fn remove(&self, user: UserId) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user)
    }

    pub fn list(&self) -> Vec<UserId> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

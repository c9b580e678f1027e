//! Protection sets: which principals may use which module.

use std::collections::{BTreeMap, BTreeSet};

use crate::Principal;

/// Name of the module that owns the authorization commands.
///
/// Its entry always exists in a tenant's protection set.
pub const ADMIN_MODULE: &str = "admin";

/// Per-tenant mapping of module name → principals granted access.
///
/// A module with no entry is *unprotected*: only the workspace owner may
/// use it. An entry with an empty set is protected but grants nobody extra.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProtectionSet {
    entries: BTreeMap<String, BTreeSet<Principal>>,
}

impl ProtectionSet {
    /// An empty set (no entries at all).
    pub fn new() -> Self {
        Self::default()
    }

    /// A cold-start set: just the admin module's empty entry.
    pub fn seeded() -> Self {
        let mut set = Self::new();
        set.ensure_entry(ADMIN_MODULE);
        set
    }

    pub fn get(&self, module: &str) -> Option<&BTreeSet<Principal>> {
        self.entries.get(module)
    }

    pub fn is_protected(&self, module: &str) -> bool {
        self.entries.contains_key(module)
    }

    pub fn contains(&self, module: &str, principal: &Principal) -> bool {
        self.entries
            .get(module)
            .is_some_and(|members| members.contains(principal))
    }

    /// Make sure `module` has an entry, without granting anyone.
    pub fn ensure_entry(&mut self, module: &str) {
        self.entries.entry(module.to_string()).or_default();
    }

    /// Grant `principal` access to `module`. Returns `true` if newly granted.
    pub fn grant(&mut self, module: &str, principal: Principal) -> bool {
        self.entries
            .entry(module.to_string())
            .or_default()
            .insert(principal)
    }

    /// Revoke `principal` from `module`. Returns `true` if it was present.
    ///
    /// The module's entry is kept even when it becomes empty.
    pub fn revoke(&mut self, module: &str, principal: &Principal) -> bool {
        self.entries
            .get_mut(module)
            .is_some_and(|members| members.remove(principal))
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<Principal>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

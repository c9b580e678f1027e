use warden_core::{TenantId, UserId};

use crate::{ProtectionSet, Role};

/// Authorization state of one execution context.
///
/// A workspace context carries its tenant id; the root context (direct
/// messages) has none and falls back to owner-only checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantPolicy {
    tenant_id: Option<TenantId>,
    owner: UserId,
    protections: ProtectionSet,
    privileged_role: Option<Role>,
    bootstrapped: bool,
}

impl TenantPolicy {
    /// Policy for a workspace, before bootstrap.
    pub fn for_tenant(tenant_id: TenantId, owner: UserId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            owner,
            protections: ProtectionSet::seeded(),
            privileged_role: None,
            bootstrapped: false,
        }
    }

    /// Policy for the root context (no workspace).
    pub fn root(owner: UserId) -> Self {
        Self {
            tenant_id: None,
            owner,
            protections: ProtectionSet::seeded(),
            privileged_role: None,
            bootstrapped: false,
        }
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn in_workspace(&self) -> bool {
        self.tenant_id.is_some()
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner == user
    }

    pub fn protections(&self) -> &ProtectionSet {
        &self.protections
    }

    pub fn protections_mut(&mut self) -> &mut ProtectionSet {
        &mut self.protections
    }

    pub fn replace_protections(&mut self, protections: ProtectionSet) {
        self.protections = protections;
    }

    pub fn privileged_role(&self) -> Option<&Role> {
        self.privileged_role.as_ref()
    }

    pub fn set_privileged_role(&mut self, role: Role) {
        self.privileged_role = Some(role);
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    pub fn mark_bootstrapped(&mut self) {
        self.bootstrapped = true;
    }
}

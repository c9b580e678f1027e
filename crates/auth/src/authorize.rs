//! The authorization rule for module access.
//!
//! - No IO
//! - No panics
//! - Denial is a normal outcome, never an error

use warden_core::RoleId;

use crate::{Invoker, Principal, SudoerSet, TenantPolicy};

/// Why access was granted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Grant {
    /// The invoker owns the workspace (or the bot, in the root context).
    Owner,
    /// The invoker is listed in the module's protection set.
    Direct,
    /// One of the invoker's roles is listed in the module's protection set.
    Role(RoleId),
    /// The invoker is a bot-wide sudoer and the module is protected.
    Sudoer,
}

/// Why access was denied.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Denial {
    /// No workspace context; only the owner may act.
    OutsideWorkspace,
    /// The module has no protection-set entry; only the owner may act.
    Unprotected,
    /// The module is protected and nothing the invoker holds is listed.
    NotGranted,
}

/// Outcome of an authorization check, with its reason.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(Grant),
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

/// Explain whether `invoker` may use `module` under `policy`.
///
/// Rules, in order:
/// 1. the owner is always allowed;
/// 2. outside a workspace nobody else is;
/// 3. a module without an entry is owner-only;
/// 4. otherwise a direct grant, a role in the entry, or sudoer membership allows.
pub fn explain(
    policy: &TenantPolicy,
    invoker: &Invoker,
    sudoers: &SudoerSet,
    module: &str,
) -> Decision {
    if policy.is_owner(invoker.user_id) {
        return Decision::Allow(Grant::Owner);
    }

    if !policy.in_workspace() {
        return Decision::Deny(Denial::OutsideWorkspace);
    }

    let Some(members) = policy.protections().get(module) else {
        return Decision::Deny(Denial::Unprotected);
    };

    if members.contains(&Principal::User(invoker.user_id)) {
        return Decision::Allow(Grant::Direct);
    }

    // Non-empty intersection between the invoker's roles and the entry.
    if let Some(role) = invoker
        .roles
        .iter()
        .find(|r| members.contains(&Principal::Role(r.id)))
    {
        return Decision::Allow(Grant::Role(role.id));
    }

    if sudoers.contains(invoker.user_id) {
        return Decision::Allow(Grant::Sudoer);
    }

    Decision::Deny(Denial::NotGranted)
}

/// Authorize `invoker` for `module` within the policy's context.
pub fn authorize(
    policy: &TenantPolicy,
    invoker: &Invoker,
    sudoers: &SudoerSet,
    module: &str,
) -> bool {
    let decision = explain(policy, invoker, sudoers, module);
    tracing::debug!(
        tenant_id = ?policy.tenant_id(),
        user_id = %invoker.user_id,
        module,
        ?decision,
        "authorization decision"
    );
    decision.is_allowed()
}

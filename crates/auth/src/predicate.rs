//! Replaceable authorization predicates.
//!
//! Every loaded module carries a [`Predicate`]. The default one applies the
//! tenant's protection set; extra checks are composed in front of it with
//! [`Predicate::and`], so earlier checks keep working.

use std::sync::Arc;

use thiserror::Error;
use warden_core::RoleId;

use crate::{Invoker, SudoerSet, TenantPolicy, authorize};

/// Everything a predicate may look at.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    pub policy: &'a TenantPolicy,
    pub invoker: &'a Invoker,
    pub sudoers: &'a SudoerSet,
    pub module: &'a str,
}

/// A check that failed for a reason worth telling the invoker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("You need the {0} role to use this command")]
    MissingRole(String),

    #[error("This command can only be used inside a workspace")]
    NotInWorkspace,
}

pub type CheckResult = Result<bool, CheckError>;

type CheckFn = dyn Fn(&CheckContext<'_>) -> CheckResult + Send + Sync;

/// How a role predicate identifies its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleIdentifier {
    Id(RoleId),
    Name(String),
}

impl RoleIdentifier {
    /// Numeric input (or a `<@&id>` mention) is an id, anything else a name.
    pub fn parse(input: &str) -> Self {
        let trimmed = input
            .strip_prefix("<@&")
            .and_then(|s| s.strip_suffix('>'))
            .unwrap_or(input);
        match trimmed.parse::<RoleId>() {
            Ok(id) => RoleIdentifier::Id(id),
            Err(_) => RoleIdentifier::Name(input.to_string()),
        }
    }

    fn held_by(&self, invoker: &Invoker) -> bool {
        match self {
            RoleIdentifier::Id(id) => invoker.has_role_id(*id),
            RoleIdentifier::Name(name) => invoker.has_role_named(name),
        }
    }
}

impl core::fmt::Display for RoleIdentifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RoleIdentifier::Id(id) => write!(f, "<@&{id}>"),
            RoleIdentifier::Name(name) => f.write_str(name),
        }
    }
}

/// A first-class, cloneable authorization check.
#[derive(Clone)]
pub struct Predicate {
    label: Arc<str>,
    check: Arc<CheckFn>,
}

impl Predicate {
    pub fn from_fn<F>(label: impl Into<Arc<str>>, check: F) -> Self
    where
        F: Fn(&CheckContext<'_>) -> CheckResult + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            check: Arc::new(check),
        }
    }

    /// The default module check: the tenant's protection set.
    pub fn protection_set() -> Self {
        Self::from_fn("protection-set", |cx| {
            Ok(authorize(cx.policy, cx.invoker, cx.sudoers, cx.module))
        })
    }

    /// Passes only for bot-wide sudoers.
    pub fn sudoer() -> Self {
        Self::from_fn("sudoer", |cx| Ok(cx.sudoers.contains(cx.invoker.user_id)))
    }

    /// Passes only when the invoker holds `role`.
    pub fn role(role: RoleIdentifier) -> Self {
        let label = format!("role({role})");
        Self::from_fn(label, move |cx| {
            if !cx.policy.in_workspace() {
                return Err(CheckError::NotInWorkspace);
            }
            if role.held_by(cx.invoker) {
                Ok(true)
            } else {
                Err(CheckError::MissingRole(role.to_string()))
            }
        })
    }

    /// `self AND next`, evaluating `self` first and short-circuiting.
    pub fn and(self, next: Predicate) -> Self {
        let label = format!("{} & {}", self.label, next.label);
        Self::from_fn(label, move |cx| Ok(self.check(cx)? && next.check(cx)?))
    }

    pub fn check(&self, cx: &CheckContext<'_>) -> CheckResult {
        (self.check)(cx)
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl core::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Predicate").field(&self.label).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use warden_core::{TenantId, UserId};

    use super::*;
    use crate::{Principal, Role};

    const OWNER: UserId = UserId::new(1);
    const MEMBER: UserId = UserId::new(2);

    fn cx<'a>(
        policy: &'a TenantPolicy,
        invoker: &'a Invoker,
        sudoers: &'a SudoerSet,
    ) -> CheckContext<'a> {
        CheckContext {
            policy,
            invoker,
            sudoers,
            module: "Reports",
        }
    }

    #[test]
    fn role_identifier_parsing() {
        assert_eq!(RoleIdentifier::parse("77"), RoleIdentifier::Id(RoleId::new(77)));
        assert_eq!(RoleIdentifier::parse("<@&77>"), RoleIdentifier::Id(RoleId::new(77)));
        assert_eq!(
            RoleIdentifier::parse("Auditor"),
            RoleIdentifier::Name("Auditor".to_string())
        );
    }

    #[test]
    fn role_predicate_raises_missing_role() {
        let policy = TenantPolicy::for_tenant(TenantId::new(1), OWNER);
        let invoker = Invoker::new(MEMBER, vec![]);
        let sudoers = SudoerSet::new();

        let p = Predicate::role(RoleIdentifier::parse("Auditor"));
        assert_eq!(
            p.check(&cx(&policy, &invoker, &sudoers)),
            Err(CheckError::MissingRole("Auditor".to_string()))
        );
    }

    #[test]
    fn role_predicate_outside_workspace() {
        let policy = TenantPolicy::root(OWNER);
        let invoker = Invoker::new(OWNER, vec![]);
        let sudoers = SudoerSet::new();

        let p = Predicate::role(RoleIdentifier::parse("Auditor"));
        assert_eq!(
            p.check(&cx(&policy, &invoker, &sudoers)),
            Err(CheckError::NotInWorkspace)
        );
    }

    #[test]
    fn composed_check_runs_extra_first_then_original() {
        let mut policy = TenantPolicy::for_tenant(TenantId::new(1), OWNER);
        policy
            .protections_mut()
            .grant("Reports", Principal::User(MEMBER));
        let sudoers = SudoerSet::new();

        let composed =
            Predicate::role(RoleIdentifier::parse("Auditor")).and(Predicate::protection_set());

        // Original allows, extra rejects: the extra's error wins.
        let member = Invoker::new(MEMBER, vec![]);
        assert!(matches!(
            composed.check(&cx(&policy, &member, &sudoers)),
            Err(CheckError::MissingRole(_))
        ));

        // Extra allows, original rejects.
        let stranger = Invoker::new(UserId::new(3), vec![Role::new(RoleId::new(8), "Auditor")]);
        assert_eq!(composed.check(&cx(&policy, &stranger, &sudoers)), Ok(false));

        // Both allow.
        let auditor = Invoker::new(MEMBER, vec![Role::new(RoleId::new(8), "Auditor")]);
        assert_eq!(composed.check(&cx(&policy, &auditor, &sudoers)), Ok(true));
        assert_eq!(composed.label(), "role(Auditor) & protection-set");
    }

    #[test]
    fn composition_preserves_captured_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let original = Predicate::from_fn("counting", move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        });

        let wrapped = Predicate::sudoer().and(original.clone()).and(original);

        let policy = TenantPolicy::for_tenant(TenantId::new(1), OWNER);
        let invoker = Invoker::new(MEMBER, vec![]);
        let sudoers = SudoerSet::from_users([MEMBER]);

        assert_eq!(wrapped.check(&cx(&policy, &invoker, &sudoers)), Ok(true));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // A non-sudoer short-circuits before the counting checks run.
        let other = Invoker::new(UserId::new(9), vec![]);
        assert_eq!(wrapped.check(&cx(&policy, &other, &sudoers)), Ok(false));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

//! `warden-auth` — per-tenant authorization (pure, no IO).
//!
//! This crate knows nothing about storage or the chat transport. It decides
//! whether an invoker may use a module given a tenant's [`TenantPolicy`].

pub mod authorize;
pub mod policy;
pub mod predicate;
pub mod principal;
pub mod protection;
pub mod roles;
pub mod sudoers;

pub use authorize::{Decision, Denial, Grant, authorize, explain};
pub use policy::TenantPolicy;
pub use predicate::{CheckContext, CheckError, CheckResult, Predicate, RoleIdentifier};
pub use principal::{Invoker, Principal};
pub use protection::{ADMIN_MODULE, ProtectionSet};
pub use roles::{Role, RoleCatalog};
pub use sudoers::SudoerSet;

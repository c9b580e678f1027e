//! One-time setup of a tenant's authorization state.

use tracing::info;

use warden_auth::{ADMIN_MODULE, Principal, RoleCatalog, TenantPolicy};

use crate::error::DispatchError;
use crate::services::Services;

/// Bring `policy` up to date with persisted state, at most once per context.
///
/// - loads the saved protection set
/// - creates the privileged role if the workspace lacks it
/// - grants the owner and the privileged role on the admin module
/// - saves only if the grants changed anything
///
/// The root context has nothing to load; it just records that it ran. A
/// failure leaves the flag unset so the next command retries.
pub async fn ensure_bootstrapped(
    services: &Services,
    policy: &mut TenantPolicy,
) -> Result<(), DispatchError> {
    if policy.is_bootstrapped() {
        return Ok(());
    }

    let Some(tenant_id) = policy.tenant_id() else {
        policy.mark_bootstrapped();
        return Ok(());
    };

    let platform = services.platform.as_ref();
    let catalog = RoleCatalog::new(platform.list_roles(tenant_id).await?);
    let mut protections = services.policies.load(platform, tenant_id, &catalog).await?;

    let role_name = services.config.privileged_role.as_str();
    let role = match catalog.by_name(role_name) {
        Some(role) => role.clone(),
        None => {
            let role = platform.create_role(tenant_id, role_name).await?;
            info!(%tenant_id, role_id = %role.id, role = role_name, "privileged role created");
            role
        }
    };

    let mut changed = protections.grant(ADMIN_MODULE, Principal::User(policy.owner()));
    changed |= protections.grant(ADMIN_MODULE, Principal::Role(role.id));
    if changed {
        services.policies.save(tenant_id, &protections).await?;
    }

    policy.replace_protections(protections);
    policy.set_privileged_role(role);
    policy.mark_bootstrapped();
    info!(%tenant_id, "tenant bootstrapped");
    Ok(())
}

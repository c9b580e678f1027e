use warden_core::TenantId;

use crate::InboundEvent;

/// Helper trait for tenant-scoped messages.
///
/// The router uses this to pick an execution context. `None` means the
/// message belongs to no workspace and goes to the root context.
pub trait TenantScoped {
    fn tenant_id(&self) -> Option<TenantId>;
}

impl TenantScoped for InboundEvent {
    fn tenant_id(&self) -> Option<TenantId> {
        self.workspace_id()
    }
}

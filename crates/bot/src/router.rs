//! Routing inbound events to per-tenant contexts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;
use tracing::info;

use warden_core::TenantId;
use warden_events::{InboundEvent, TenantScoped};

use crate::context::TenantContext;
use crate::error::DispatchError;
use crate::services::Services;

struct Slot {
    cell: Arc<OnceCell<Arc<TenantContext>>>,
    last_used: u64,
}

impl Slot {
    /// No build is in progress and no dispatch holds the context.
    fn is_idle(&self) -> bool {
        Arc::strong_count(&self.cell) == 1
            && self
                .cell
                .get()
                .is_none_or(|context| Arc::strong_count(context) == 1)
    }
}

#[derive(Default)]
struct Slots {
    by_tenant: HashMap<TenantId, Slot>,
    clock: u64,
}

/// Maps events to tenant contexts, creating them on first use.
///
/// - One slot per tenant; concurrent first events share the slot's cell, so
///   exactly one context is built.
/// - A failed build leaves the cell empty and the next event retries.
/// - At most `max_tenants` idle slots are kept; the least recently used idle
///   one is evicted and rebuilt from persisted policy when it is next needed.
///   A context with a command in flight is never evicted, so the cache may
///   run over capacity until those commands finish.
pub struct TenantRouter {
    services: Arc<Services>,
    root: Arc<TenantContext>,
    slots: Mutex<Slots>,
}

impl TenantRouter {
    pub fn new(services: Arc<Services>) -> Self {
        let root = Arc::new(TenantContext::root(services.clone()));
        Self {
            services,
            root,
            slots: Mutex::new(Slots::default()),
        }
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// The context for events outside any workspace.
    pub fn root(&self) -> &Arc<TenantContext> {
        &self.root
    }

    /// Route and dispatch `event`, returning the reply if one was sent.
    pub async fn handle(&self, event: &InboundEvent) -> Result<Option<String>, DispatchError> {
        let context = self.route(event).await?;
        context.dispatch(event).await
    }

    /// The context responsible for `event`.
    pub async fn route(&self, event: &InboundEvent) -> Result<Arc<TenantContext>, DispatchError> {
        let Some(tenant_id) = event.tenant_id() else {
            return Ok(self.root.clone());
        };

        let cell = self.slot(tenant_id);
        let services = self.services.clone();
        let built = cell
            .get_or_try_init(|| async move {
                TenantContext::for_tenant(services, tenant_id).await.map(Arc::new)
            })
            .await;

        match built {
            Ok(context) => Ok(context.clone()),
            Err(e) => {
                self.forget_if_empty(tenant_id, &cell);
                Err(e)
            }
        }
    }

    /// Cached workspace contexts (the root context is not counted).
    pub fn len(&self) -> usize {
        self.lock()
            .by_tenant
            .values()
            .filter(|slot| slot.cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, tenant_id: TenantId) -> bool {
        self.lock()
            .by_tenant
            .get(&tenant_id)
            .is_some_and(|slot| slot.cell.initialized())
    }

    fn slot(&self, tenant_id: TenantId) -> Arc<OnceCell<Arc<TenantContext>>> {
        let mut slots = self.lock();
        slots.clock += 1;
        let now = slots.clock;

        let cell = {
            let slot = slots.by_tenant.entry(tenant_id).or_insert_with(|| Slot {
                cell: Arc::new(OnceCell::new()),
                last_used: now,
            });
            slot.last_used = now;
            slot.cell.clone()
        };

        let capacity = self.services.config.max_tenants;
        while slots.by_tenant.len() > capacity {
            let Some(victim) = slots
                .by_tenant
                .iter()
                .filter(|(id, slot)| **id != tenant_id && slot.is_idle())
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(id, _)| *id)
            else {
                break;
            };
            slots.by_tenant.remove(&victim);
            info!(tenant_id = %victim, "tenant context evicted");
        }

        cell
    }

    fn forget_if_empty(&self, tenant_id: TenantId, cell: &Arc<OnceCell<Arc<TenantContext>>>) {
        let mut slots = self.lock();
        let stale = slots
            .by_tenant
            .get(&tenant_id)
            .is_some_and(|slot| Arc::ptr_eq(&slot.cell, cell) && !slot.cell.initialized());
        if stale {
            slots.by_tenant.remove(&tenant_id);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl core::fmt::Debug for TenantRouter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TenantRouter")
            .field("cached", &self.len())
            .finish_non_exhaustive()
    }
}

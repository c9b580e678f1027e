//! Process-wide collaborators shared by every tenant context.

use std::sync::Arc;

use tokio::sync::Notify;

use warden_auth::SudoerSet;
use warden_infra::{Platform, PolicyRepository, PolicyStore, WardenConfig};

use crate::module::ModuleCatalog;

/// Everything a tenant context borrows from the process.
///
/// Contexts clone the `Arc<Services>`; nothing here is per-tenant, so a new
/// context never opens its own platform session.
pub struct Services {
    pub platform: Arc<dyn Platform>,
    pub policies: PolicyRepository,
    pub catalog: ModuleCatalog,
    pub sudoers: SudoerSet,
    pub config: WardenConfig,
    pub shutdown: Notify,
}

impl Services {
    pub fn new(
        platform: Arc<dyn Platform>,
        store: Arc<dyn PolicyStore>,
        catalog: ModuleCatalog,
        config: WardenConfig,
    ) -> Self {
        Self {
            platform,
            policies: PolicyRepository::new(store, config.lookup_timeout),
            catalog,
            sudoers: SudoerSet::new(),
            config,
            shutdown: Notify::new(),
        }
    }

    /// Ask the process to stop. The permit is kept until someone waits.
    pub fn request_shutdown(&self) {
        tracing::info!("shutdown requested");
        self.shutdown.notify_one();
    }
}

impl core::fmt::Debug for Services {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Services")
            .field("policies", &self.policies)
            .field("catalog", &self.catalog)
            .field("sudoers", &self.sudoers)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

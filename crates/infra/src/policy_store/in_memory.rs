use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use warden_core::TenantId;

use super::r#trait::{PersistedPolicy, PolicyStore, PolicyStoreError};

/// In-memory policy store for tests/dev.
///
/// Writes can be made to fail on demand to exercise persistence errors.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    documents: RwLock<HashMap<TenantId, PersistedPolicy>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tenant_id: TenantId, policy: PersistedPolicy) {
        if let Ok(mut docs) = self.documents.write() {
            docs.insert(tenant_id, policy);
        }
    }

    pub fn get(&self, tenant_id: TenantId) -> Option<PersistedPolicy> {
        self.documents.read().ok()?.get(&tenant_id).cloned()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn read(&self, tenant_id: TenantId) -> Result<Option<PersistedPolicy>, PolicyStoreError> {
        let docs = self
            .documents
            .read()
            .map_err(|_| PolicyStoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(docs.get(&tenant_id).cloned())
    }

    fn write(&self, tenant_id: TenantId, policy: &PersistedPolicy) -> Result<(), PolicyStoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PolicyStoreError::Unavailable("writes disabled".to_string()));
        }

        let mut docs = self
            .documents
            .write()
            .map_err(|_| PolicyStoreError::Unavailable("lock poisoned".to_string()))?;
        docs.insert(tenant_id, policy.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

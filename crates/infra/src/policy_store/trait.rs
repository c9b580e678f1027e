use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_auth::ProtectionSet;
use warden_core::TenantId;

/// On-disk form of one tenant's protection set.
///
/// Module name → sorted principal ids. Whether an id is a user or a role is
/// not recorded; it is recovered on load.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedPolicy(BTreeMap<String, Vec<u64>>);

impl PersistedPolicy {
    pub fn new(entries: BTreeMap<String, Vec<u64>>) -> Self {
        Self(entries)
    }

    pub fn from_protections(protections: &ProtectionSet) -> Self {
        let entries = protections
            .iter()
            .map(|(module, members)| {
                let mut ids: Vec<u64> = members.iter().map(|p| p.raw_id()).collect();
                ids.sort_unstable();
                ids.dedup();
                (module.to_string(), ids)
            })
            .collect();
        Self(entries)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &[u64])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn get(&self, module: &str) -> Option<&[u64]> {
        self.0.get(module).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Policy persistence failure.
///
/// A missing document is *not* an error (`read` returns `Ok(None)`); every
/// variant here is fatal for the operation that hit it.
#[derive(Debug, Error)]
pub enum PolicyStoreError {
    #[error("policy io failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("policy document for tenant {tenant_id} is malformed: {source}")]
    Malformed {
        tenant_id: TenantId,
        #[source]
        source: serde_json::Error,
    },

    #[error("policy serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("policy storage unavailable: {0}")]
    Unavailable(String),
}

/// Tenant-scoped policy storage.
///
/// Implementations are blocking; callers on the async path go through
/// [`super::PolicyRepository`], which moves the work to the blocking pool.
pub trait PolicyStore: Send + Sync {
    /// Read the tenant's document. `Ok(None)` means none was ever saved.
    fn read(&self, tenant_id: TenantId) -> Result<Option<PersistedPolicy>, PolicyStoreError>;

    /// Replace the tenant's document.
    fn write(&self, tenant_id: TenantId, policy: &PersistedPolicy) -> Result<(), PolicyStoreError>;
}

impl<S> PolicyStore for Arc<S>
where
    S: PolicyStore + ?Sized,
{
    fn read(&self, tenant_id: TenantId) -> Result<Option<PersistedPolicy>, PolicyStoreError> {
        (**self).read(tenant_id)
    }

    fn write(&self, tenant_id: TenantId, policy: &PersistedPolicy) -> Result<(), PolicyStoreError> {
        (**self).write(tenant_id, policy)
    }
}

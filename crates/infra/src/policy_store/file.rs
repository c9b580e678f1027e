//! JSON files on local disk, one directory per tenant.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use warden_core::TenantId;

use super::r#trait::{PersistedPolicy, PolicyStore, PolicyStoreError};

const POLICY_FILE: &str = "protections.json";

/// Stores each tenant's policy at `<root>/<tenant_id>/protections.json`.
///
/// Writes go to a temp file in the same directory and are renamed into
/// place, so a reader never sees a half-written document. There is no
/// cross-process locking; one bot instance owns the directory.
#[derive(Debug, Clone)]
pub struct FilePolicyStore {
    root: PathBuf,
}

impl FilePolicyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tenant_dir(&self, tenant_id: TenantId) -> PathBuf {
        self.root.join(tenant_id.to_string())
    }

    pub fn policy_path(&self, tenant_id: TenantId) -> PathBuf {
        self.tenant_dir(tenant_id).join(POLICY_FILE)
    }
}

impl PolicyStore for FilePolicyStore {
    fn read(&self, tenant_id: TenantId) -> Result<Option<PersistedPolicy>, PolicyStoreError> {
        let path = self.policy_path(tenant_id);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(PolicyStoreError::Io { path, source }),
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| PolicyStoreError::Malformed { tenant_id, source })
    }

    fn write(&self, tenant_id: TenantId, policy: &PersistedPolicy) -> Result<(), PolicyStoreError> {
        let dir = self.tenant_dir(tenant_id);
        fs::create_dir_all(&dir).map_err(|source| PolicyStoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut data = serde_json::to_vec_pretty(policy).map_err(PolicyStoreError::Serialize)?;
        data.push(b'\n');

        atomic_write(&self.policy_path(tenant_id), &data)
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), PolicyStoreError> {
    let mut tmp = path.to_path_buf();
    tmp.set_extension("json.tmp");

    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| PolicyStoreError::Io { path, source }
    };

    let mut file = fs::File::create(&tmp).map_err(io_err(&tmp))?;
    file.write_all(data).map_err(io_err(&tmp))?;
    file.sync_all().map_err(io_err(&tmp))?;
    drop(file);

    fs::rename(&tmp, path).map_err(io_err(path))
}

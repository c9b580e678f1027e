//! Loading and saving protection sets on the async path.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use warden_auth::{Principal, ProtectionSet, RoleCatalog};
use warden_core::{RoleId, TenantId, UserId};

use super::r#trait::{PersistedPolicy, PolicyStore, PolicyStoreError};
use crate::platform::{Platform, with_timeout};

/// Policy persistence as used by tenant contexts.
///
/// - Blocking store I/O runs on tokio's blocking pool, so one tenant's disk
///   write never stalls another tenant's dispatch.
/// - Loaded ids are reconciled against the platform: a user lookup first,
///   then the tenant's role catalog. Ids that match neither are skipped.
#[derive(Clone)]
pub struct PolicyRepository {
    store: Arc<dyn PolicyStore>,
    lookup_timeout: Duration,
}

impl PolicyRepository {
    pub fn new(store: Arc<dyn PolicyStore>, lookup_timeout: Duration) -> Self {
        Self {
            store,
            lookup_timeout,
        }
    }

    pub fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }

    /// Load a tenant's protection set.
    ///
    /// A tenant with no saved document gets a cold-start set (admin entry
    /// only). The admin entry is always present in the result.
    pub async fn load(
        &self,
        platform: &dyn Platform,
        tenant_id: TenantId,
        catalog: &RoleCatalog,
    ) -> Result<ProtectionSet, PolicyStoreError> {
        let store = self.store.clone();
        let document = tokio::task::spawn_blocking(move || store.read(tenant_id))
            .await
            .map_err(|e| PolicyStoreError::Unavailable(format!("policy read task failed: {e}")))??;

        let Some(document) = document else {
            info!(%tenant_id, "no saved policy; starting cold");
            return Ok(ProtectionSet::seeded());
        };

        let protections = self.reconcile(platform, tenant_id, catalog, &document).await;
        info!(%tenant_id, modules = protections.len(), "policy loaded");
        Ok(protections)
    }

    /// Persist a tenant's protection set, replacing what was there.
    pub async fn save(
        &self,
        tenant_id: TenantId,
        protections: &ProtectionSet,
    ) -> Result<(), PolicyStoreError> {
        let document = PersistedPolicy::from_protections(protections);
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.write(tenant_id, &document))
            .await
            .map_err(|e| PolicyStoreError::Unavailable(format!("policy write task failed: {e}")))??;

        info!(%tenant_id, modules = protections.len(), "policy saved");
        Ok(())
    }

    async fn reconcile(
        &self,
        platform: &dyn Platform,
        tenant_id: TenantId,
        catalog: &RoleCatalog,
        document: &PersistedPolicy,
    ) -> ProtectionSet {
        let mut protections = ProtectionSet::seeded();
        let mut resolved: HashMap<u64, Option<Principal>> = HashMap::new();

        for (module, ids) in document.entries() {
            protections.ensure_entry(module);

            for &raw in ids {
                let principal = match resolved.get(&raw) {
                    Some(known) => *known,
                    None => {
                        let found = self.resolve(platform, catalog, raw).await;
                        resolved.insert(raw, found);
                        found
                    }
                };

                match principal {
                    Some(principal) => {
                        protections.grant(module, principal);
                    }
                    None => warn!(
                        %tenant_id,
                        module,
                        id = raw,
                        "persisted id is neither a user nor a role; skipping"
                    ),
                }
            }
        }

        protections
    }

    async fn resolve(
        &self,
        platform: &dyn Platform,
        catalog: &RoleCatalog,
        raw: u64,
    ) -> Option<Principal> {
        let user_id = UserId::new(raw);
        match with_timeout(self.lookup_timeout, platform.fetch_user(user_id)).await {
            Ok(_) => return Some(Principal::User(user_id)),
            Err(e) => tracing::debug!(id = raw, error = %e, "user lookup failed; trying roles"),
        }

        let role_id = RoleId::new(raw);
        catalog.contains(role_id).then_some(Principal::Role(role_id))
    }
}

impl core::fmt::Debug for PolicyRepository {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PolicyRepository")
            .field("lookup_timeout", &self.lookup_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;
    use warden_auth::{ADMIN_MODULE, Role};

    use super::*;
    use crate::platform::{InMemoryPlatform, UserProfile};
    use crate::policy_store::{FilePolicyStore, InMemoryPolicyStore};

    const TENANT: TenantId = TenantId::new(10);

    fn repo(store: Arc<dyn PolicyStore>) -> PolicyRepository {
        PolicyRepository::new(store, Duration::from_millis(50))
    }

    fn platform_with(users: &[u64]) -> InMemoryPlatform {
        let platform = InMemoryPlatform::new();
        for &id in users {
            platform.add_user(UserProfile::new(UserId::new(id), format!("user-{id}")));
        }
        platform
    }

    #[tokio::test]
    async fn cold_start_is_seeded_admin_entry() {
        let repo = repo(Arc::new(InMemoryPolicyStore::new()));
        let loaded = repo
            .load(&InMemoryPlatform::new(), TENANT, &RoleCatalog::default())
            .await
            .unwrap();
        assert_eq!(loaded, ProtectionSet::seeded());
    }

    #[tokio::test]
    async fn reconciles_users_first_then_roles_and_skips_unknown() {
        let store = Arc::new(InMemoryPolicyStore::new());
        let mut entries = BTreeMap::new();
        entries.insert("admin".to_string(), vec![1, 500]);
        entries.insert("Billing".to_string(), vec![2, 500, 999]);
        store.insert(TENANT, PersistedPolicy::new(entries));

        let platform = platform_with(&[1, 2]);
        let catalog = RoleCatalog::new(vec![Role::new(RoleId::new(500), "Bot Admin")]);

        let loaded = repo(store).load(&platform, TENANT, &catalog).await.unwrap();

        let billing: Vec<_> = loaded.get("Billing").unwrap().iter().copied().collect();
        assert_eq!(
            billing,
            vec![
                Principal::User(UserId::new(2)),
                Principal::Role(RoleId::new(500)),
            ]
        );
        assert!(loaded.contains("admin", &Principal::User(UserId::new(1))));
        assert!(loaded.contains("admin", &Principal::Role(RoleId::new(500))));
    }

    #[tokio::test]
    async fn lookup_timeout_falls_back_to_role() {
        let store = Arc::new(InMemoryPolicyStore::new());
        let mut entries = BTreeMap::new();
        entries.insert("Billing".to_string(), vec![500]);
        store.insert(TENANT, PersistedPolicy::new(entries));

        // 500 is also a user id here, but the lookup is too slow to count.
        let platform = platform_with(&[500]);
        platform.set_lookup_delay(Some(Duration::from_millis(500)));
        let catalog = RoleCatalog::new(vec![Role::new(RoleId::new(500), "Bot Admin")]);

        let loaded = repo(store).load(&platform, TENANT, &catalog).await.unwrap();
        assert!(loaded.contains("Billing", &Principal::Role(RoleId::new(500))));
        assert!(loaded.is_protected(ADMIN_MODULE));
    }

    #[tokio::test]
    async fn write_failures_are_fatal() {
        let store = Arc::new(InMemoryPolicyStore::new());
        store.set_fail_writes(true);

        let err = repo(store)
            .save(TENANT, &ProtectionSet::seeded())
            .await
            .unwrap_err();
        assert!(matches!(err, PolicyStoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn malformed_file_is_fatal_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePolicyStore::new(dir.path());
        std::fs::create_dir_all(store.tenant_dir(TENANT)).unwrap();
        std::fs::write(store.policy_path(TENANT), b"[1, 2").unwrap();

        let err = repo(Arc::new(store))
            .load(&InMemoryPlatform::new(), TENANT, &RoleCatalog::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PolicyStoreError::Malformed { .. }));
    }

    fn arb_protections() -> impl Strategy<Value = ProtectionSet> {
        let principal = prop_oneof![
            (1u64..20).prop_map(|id| Principal::User(UserId::new(id))),
            (500u64..520).prop_map(|id| Principal::Role(RoleId::new(id))),
        ];
        prop::collection::vec(
            ("[A-Za-z]{1,10}", prop::collection::vec(principal, 0..6)),
            0..8,
        )
        .prop_map(|entries| {
            let mut set = ProtectionSet::seeded();
            for (module, members) in entries {
                set.ensure_entry(&module);
                for member in members {
                    set.grant(&module, member);
                }
            }
            set
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: save then load is the identity when every id resolves.
        #[test]
        fn save_then_load_round_trips(protections in arb_protections()) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            let dir = tempfile::tempdir().unwrap();
            let repo = repo(Arc::new(FilePolicyStore::new(dir.path())));
            let platform = platform_with(&(1..20).collect::<Vec<_>>());
            let catalog = RoleCatalog::new(
                (500u64..520)
                    .map(|id| Role::new(RoleId::new(id), format!("role-{id}")))
                    .collect(),
            );

            let loaded = runtime.block_on(async {
                repo.save(TENANT, &protections).await.unwrap();
                repo.load(&platform, TENANT, &catalog).await.unwrap()
            });

            prop_assert_eq!(loaded, protections);
        }
    }
}

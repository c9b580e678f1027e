//! The chat platform as seen by the authorization core.
//!
//! The real gateway client is an external collaborator; it implements
//! [`Platform`]. Every tenant context holds a clone of the same
//! `Arc<dyn Platform>`, so there is one session for the whole process.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_auth::Role;
use warden_core::{ChannelId, RoleId, TenantId, UserId};

/// A user account as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub is_bot: bool,
}

impl UserProfile {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_bot: false,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("platform lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("platform request failed: {0}")]
    Transport(String),
}

impl PlatformError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

/// Operations the core needs from the chat platform.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn fetch_user(&self, user_id: UserId) -> Result<UserProfile, PlatformError>;

    async fn workspace_owner(&self, tenant_id: TenantId) -> Result<UserId, PlatformError>;

    async fn list_roles(&self, tenant_id: TenantId) -> Result<Vec<Role>, PlatformError>;

    async fn create_role(&self, tenant_id: TenantId, name: &str) -> Result<Role, PlatformError>;

    /// Roles `user_id` holds in `tenant_id`.
    async fn member_roles(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Vec<Role>, PlatformError>;

    async fn assign_role(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<(), PlatformError>;

    async fn unassign_role(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<(), PlatformError>;

    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<(), PlatformError>;
}

/// Bound a platform lookup; running out of time is reported as
/// [`PlatformError::Timeout`] so callers can treat it like any other failure.
pub async fn with_timeout<T, F>(limit: Duration, lookup: F) -> Result<T, PlatformError>
where
    F: Future<Output = Result<T, PlatformError>>,
{
    match tokio::time::timeout(limit, lookup).await {
        Ok(result) => result,
        Err(_) => Err(PlatformError::Timeout(limit)),
    }
}

/// A message the bot sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel_id: ChannelId,
    pub content: String,
}

#[derive(Debug, Default)]
struct Workspace {
    owner: UserId,
    roles: Vec<Role>,
    members: HashMap<UserId, BTreeSet<RoleId>>,
    lookup_delay: Option<Duration>,
}

#[derive(Debug)]
struct State {
    users: HashMap<UserId, UserProfile>,
    workspaces: HashMap<TenantId, Workspace>,
    next_role_id: u64,
    sent: Vec<SentMessage>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            users: HashMap::new(),
            workspaces: HashMap::new(),
            next_role_id: 900_000,
            sent: Vec::new(),
        }
    }
}

/// In-memory platform for tests and the dev binary.
///
/// - No IO
/// - Sent messages are recorded (and logged) instead of delivered
/// - Optional delays on user/member lookups (global or per workspace)
///   exercise lookup timeouts and cross-tenant concurrency
#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    state: RwLock<State>,
    lookup_delay: RwLock<Option<Duration>>,
    owner_lookups: AtomicUsize,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, profile: UserProfile) {
        if let Ok(mut state) = self.state.write() {
            state.users.insert(profile.id, profile);
        }
    }

    pub fn add_workspace(&self, tenant_id: TenantId, owner: UserId) {
        if let Ok(mut state) = self.state.write() {
            state.workspaces.entry(tenant_id).or_default().owner = owner;
        }
    }

    /// Register `tenant_id` with `owner` unless it is already known.
    /// Returns `true` if the workspace was new.
    pub fn ensure_workspace(&self, tenant_id: TenantId, owner: UserId) -> bool {
        let Ok(mut state) = self.state.write() else {
            return false;
        };
        if state.workspaces.contains_key(&tenant_id) {
            return false;
        }
        state.workspaces.entry(tenant_id).or_default().owner = owner;
        true
    }

    /// Define a role with a fixed id (as if created outside the bot).
    pub fn add_role(&self, tenant_id: TenantId, role: Role) {
        if let Ok(mut state) = self.state.write() {
            state
                .workspaces
                .entry(tenant_id)
                .or_default()
                .roles
                .push(role);
        }
    }

    pub fn set_lookup_delay(&self, delay: Option<Duration>) {
        if let Ok(mut slot) = self.lookup_delay.write() {
            *slot = delay;
        }
    }

    /// Slow down member lookups for one workspace only.
    pub fn set_workspace_delay(&self, tenant_id: TenantId, delay: Option<Duration>) {
        if let Ok(mut state) = self.state.write() {
            state.workspaces.entry(tenant_id).or_default().lookup_delay = delay;
        }
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.state
            .read()
            .map(|s| s.sent.clone())
            .unwrap_or_default()
    }

    pub fn last_message(&self, channel_id: ChannelId) -> Option<String> {
        let state = self.state.read().ok()?;
        state
            .sent
            .iter()
            .rev()
            .find(|m| m.channel_id == channel_id)
            .map(|m| m.content.clone())
    }

    /// How many times `workspace_owner` was called (context constructions).
    pub fn owner_lookups(&self) -> usize {
        self.owner_lookups.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        let delay = self.lookup_delay.read().ok().and_then(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn workspace_delay(&self, tenant_id: TenantId) {
        let delay = self
            .state
            .read()
            .ok()
            .and_then(|s| s.workspaces.get(&tenant_id).and_then(|w| w.lookup_delay));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, PlatformError> {
        self.state
            .read()
            .map_err(|_| PlatformError::Transport("state lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, PlatformError> {
        self.state
            .write()
            .map_err(|_| PlatformError::Transport("state lock poisoned".to_string()))
    }
}

#[async_trait]
impl Platform for InMemoryPlatform {
    async fn fetch_user(&self, user_id: UserId) -> Result<UserProfile, PlatformError> {
        self.delay().await;
        self.read()?
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("user {user_id}")))
    }

    async fn workspace_owner(&self, tenant_id: TenantId) -> Result<UserId, PlatformError> {
        self.owner_lookups.fetch_add(1, Ordering::SeqCst);
        self.read()?
            .workspaces
            .get(&tenant_id)
            .map(|w| w.owner)
            .ok_or_else(|| PlatformError::not_found(format!("workspace {tenant_id}")))
    }

    async fn list_roles(&self, tenant_id: TenantId) -> Result<Vec<Role>, PlatformError> {
        Ok(self
            .read()?
            .workspaces
            .get(&tenant_id)
            .map(|w| w.roles.clone())
            .unwrap_or_default())
    }

    async fn create_role(&self, tenant_id: TenantId, name: &str) -> Result<Role, PlatformError> {
        let mut state = self.write()?;
        state.next_role_id += 1;
        let role = Role::new(RoleId::new(state.next_role_id), name);
        state
            .workspaces
            .entry(tenant_id)
            .or_default()
            .roles
            .push(role.clone());
        Ok(role)
    }

    async fn member_roles(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Vec<Role>, PlatformError> {
        self.delay().await;
        self.workspace_delay(tenant_id).await;
        let state = self.read()?;
        let Some(workspace) = state.workspaces.get(&tenant_id) else {
            return Ok(Vec::new());
        };
        let held = workspace.members.get(&user_id);
        Ok(workspace
            .roles
            .iter()
            .filter(|r| held.is_some_and(|h| h.contains(&r.id)))
            .cloned()
            .collect())
    }

    async fn assign_role(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<(), PlatformError> {
        let mut state = self.write()?;
        let workspace = state
            .workspaces
            .get_mut(&tenant_id)
            .ok_or_else(|| PlatformError::not_found(format!("workspace {tenant_id}")))?;
        if !workspace.roles.iter().any(|r| r.id == role_id) {
            return Err(PlatformError::not_found(format!("role {role_id}")));
        }
        workspace.members.entry(user_id).or_default().insert(role_id);
        Ok(())
    }

    async fn unassign_role(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<(), PlatformError> {
        let mut state = self.write()?;
        if let Some(held) = state
            .workspaces
            .get_mut(&tenant_id)
            .and_then(|w| w.members.get_mut(&user_id))
        {
            held.remove(&role_id);
        }
        Ok(())
    }

    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<(), PlatformError> {
        tracing::info!(%channel_id, content, "send message");
        self.write()?.sent.push(SentMessage {
            channel_id,
            content: content.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TENANT: TenantId = TenantId::new(1);

    #[tokio::test]
    async fn role_assignment_round_trip() {
        let platform = InMemoryPlatform::new();
        platform.add_workspace(TENANT, UserId::new(1));
        let role = platform.create_role(TENANT, "Bot Admin").await.unwrap();

        platform.assign_role(TENANT, UserId::new(2), role.id).await.unwrap();
        assert_eq!(
            platform.member_roles(TENANT, UserId::new(2)).await.unwrap(),
            vec![role.clone()]
        );

        platform.unassign_role(TENANT, UserId::new(2), role.id).await.unwrap();
        assert!(platform.member_roles(TENANT, UserId::new(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn assigning_unknown_role_fails() {
        let platform = InMemoryPlatform::new();
        platform.add_workspace(TENANT, UserId::new(1));

        let err = platform
            .assign_role(TENANT, UserId::new(2), RoleId::new(5))
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::NotFound(_)));
    }

    #[tokio::test]
    async fn slow_lookups_time_out() {
        let platform = InMemoryPlatform::new();
        platform.add_user(UserProfile::new(UserId::new(3), "slow"));
        platform.set_lookup_delay(Some(Duration::from_millis(200)));

        let err = with_timeout(Duration::from_millis(10), platform.fetch_user(UserId::new(3)))
            .await
            .unwrap_err();
        assert_eq!(err, PlatformError::Timeout(Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn workspace_delay_only_slows_that_workspace() {
        let platform = InMemoryPlatform::new();
        let other = TenantId::new(2);
        platform.add_workspace(TENANT, UserId::new(1));
        platform.add_workspace(other, UserId::new(1));
        platform.set_workspace_delay(TENANT, Some(Duration::from_millis(200)));

        let slow = with_timeout(
            Duration::from_millis(20),
            platform.member_roles(TENANT, UserId::new(1)),
        )
        .await;
        assert!(matches!(slow, Err(PlatformError::Timeout(_))));

        let fast = with_timeout(
            Duration::from_millis(20),
            platform.member_roles(other, UserId::new(1)),
        )
        .await;
        assert!(fast.unwrap().is_empty());
    }
}

//! Per-tenant execution contexts.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

use warden_auth::{CheckContext, Invoker, TenantPolicy};
use warden_core::TenantId;
use warden_events::{InboundEvent, Invocation};
use warden_infra::platform::with_timeout;

use crate::bootstrap::ensure_bootstrapped;
use crate::error::{CommandError, DispatchError};
use crate::module::ModuleRegistry;
use crate::services::Services;

/// Command handling for one workspace (or, for the root context, for
/// direct messages).
///
/// Dispatch is serialized per context by the policy mutex; distinct
/// contexts run independently.
#[derive(Debug)]
pub struct TenantContext {
    tenant_id: Option<TenantId>,
    services: Arc<Services>,
    registry: ModuleRegistry,
    policy: Mutex<TenantPolicy>,
}

impl TenantContext {
    /// Build the context for a workspace. The owner is looked up once, here.
    pub async fn for_tenant(
        services: Arc<Services>,
        tenant_id: TenantId,
    ) -> Result<Self, DispatchError> {
        let owner = with_timeout(
            services.config.lookup_timeout,
            services.platform.workspace_owner(tenant_id),
        )
        .await?;

        info!(%tenant_id, %owner, "tenant context created");
        Ok(Self::with_policy(services, TenantPolicy::for_tenant(tenant_id, owner)))
    }

    /// The context for events outside any workspace, owned by the bot owner.
    pub fn root(services: Arc<Services>) -> Self {
        let owner = services.config.owner_id;
        Self::with_policy(services, TenantPolicy::root(owner))
    }

    fn with_policy(services: Arc<Services>, policy: TenantPolicy) -> Self {
        let registry = ModuleRegistry::new();
        for name in &services.config.baseline_modules {
            match services.catalog.instantiate(name) {
                Some(module) => {
                    registry.load(module);
                }
                None => warn!(module = %name, "baseline module is not in the catalog"),
            }
        }

        Self {
            tenant_id: policy.tenant_id(),
            services,
            registry,
            policy: Mutex::new(policy),
        }
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Snapshot of the current policy, waiting for any running command.
    pub async fn policy(&self) -> TenantPolicy {
        self.policy.lock().await.clone()
    }

    /// Handle one inbound event.
    ///
    /// Returns the reply that was sent, or `None` when the event was not a
    /// command for this context (no prefix, unknown command, or rejected by a
    /// global check).
    pub async fn dispatch(&self, event: &InboundEvent) -> Result<Option<String>, DispatchError> {
        let parsed = match Invocation::parse(&self.services.config.command_prefix, event.content()) {
            Ok(None) => return Ok(None),
            parsed => parsed,
        };
        // Global checks gate every reply, including parse errors.
        if self.rejected_by_global_check(event) {
            return Ok(None);
        }
        let invocation = match parsed {
            Ok(Some(invocation)) => invocation,
            Ok(None) => return Ok(None),
            Err(e) => return self.reply(event, e.to_string()).await.map(Some),
        };

        let span = tracing::info_span!(
            "dispatch",
            correlation_id = %Uuid::now_v7(),
            tenant_id = ?event.workspace_id(),
            user_id = %event.author().id,
            command = invocation.command(),
        );

        async move {
            let Some(reply) = self.run(event, &invocation).await? else {
                return Ok(None);
            };
            self.reply(event, reply).await.map(Some)
        }
        .instrument(span)
        .await
    }

    fn rejected_by_global_check(&self, event: &InboundEvent) -> bool {
        match self
            .registry
            .handles()
            .into_iter()
            .find(|h| !h.module().allows(event))
        {
            Some(handle) => {
                debug!(module = handle.name(), "event rejected by global check");
                true
            }
            None => false,
        }
    }

    async fn run(
        &self,
        event: &InboundEvent,
        invocation: &Invocation,
    ) -> Result<Option<String>, DispatchError> {
        let Some(handle) = self.registry.find_command(invocation.command()) else {
            debug!("unknown command ignored");
            return Ok(None);
        };

        let mut policy = self.policy.lock().await;
        ensure_bootstrapped(&self.services, &mut policy).await?;

        let invoker = Invoker::new(event.author().id, self.member_roles(&policy, event).await);

        let check = CheckContext {
            policy: &*policy,
            invoker: &invoker,
            sudoers: &self.services.sudoers,
            module: handle.name(),
        };
        match handle.predicate().check(&check) {
            Ok(true) => {}
            Ok(false) => return Ok(Some(format!("You are not allowed to use {}", handle.name()))),
            Err(e) => return Ok(Some(e.to_string())),
        }

        let mut cx = CommandContext {
            tenant: self,
            policy: &mut *policy,
            event,
            invoker: &invoker,
        };
        match handle.module().execute(&mut cx, invocation).await {
            Ok(reply) => Ok(Some(reply)),
            Err(e) if e.is_user_facing() => Ok(Some(e.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Roles the author holds here; a failed or slow lookup counts as none.
    async fn member_roles(&self, policy: &TenantPolicy, event: &InboundEvent) -> Vec<warden_auth::Role> {
        let Some(tenant_id) = policy.tenant_id() else {
            return Vec::new();
        };
        let lookup = self.services.platform.member_roles(tenant_id, event.author().id);
        match with_timeout(self.services.config.lookup_timeout, lookup).await {
            Ok(roles) => roles,
            Err(e) => {
                warn!(%tenant_id, user_id = %event.author().id, error = %e, "member role lookup failed");
                Vec::new()
            }
        }
    }

    async fn reply(&self, event: &InboundEvent, reply: String) -> Result<String, DispatchError> {
        self.services
            .platform
            .send_message(event.channel_id(), &reply)
            .await?;
        Ok(reply)
    }
}

/// What a running command can see and change.
pub struct CommandContext<'a> {
    pub tenant: &'a TenantContext,
    pub policy: &'a mut TenantPolicy,
    pub event: &'a InboundEvent,
    pub invoker: &'a Invoker,
}

impl CommandContext<'_> {
    pub fn services(&self) -> &Services {
        &self.tenant.services
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.tenant.registry
    }

    /// The workspace this command runs in; workspace-only commands fail
    /// with [`CommandError::NotInWorkspace`] in the root context.
    pub fn workspace(&self) -> Result<TenantId, CommandError> {
        self.policy.tenant_id().ok_or(CommandError::NotInWorkspace)
    }

    /// Save the current protection set. Called after every mutation.
    pub async fn persist(&self) -> Result<(), CommandError> {
        let tenant_id = self.workspace()?;
        self.services()
            .policies
            .save(tenant_id, self.policy.protections())
            .await?;
        Ok(())
    }
}

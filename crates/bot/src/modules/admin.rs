//! The admin module: protections, sudoers, and module management.
//!
//! Every mutation of the protection set is saved before the command
//! replies. If the save fails the in-memory change stays and the command
//! fails with a persistence error.

use async_trait::async_trait;

use warden_auth::{ADMIN_MODULE, Predicate, Principal, Role, RoleCatalog, RoleIdentifier};
use warden_core::{RoleId, UserId};
use warden_events::Invocation;
use warden_infra::UserProfile;
use warden_infra::platform::with_timeout;

use crate::context::CommandContext;
use crate::error::CommandError;
use crate::module::{CommandSpec, Module};
use crate::modules::SAFETY_MODULE;

const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new("protect", "protect <module> [principal]"),
    CommandSpec::new("unprotect", "unprotect <module> [principal]"),
    CommandSpec::new("status", "status"),
    CommandSpec::new("add_su", "add_su <user>"),
    CommandSpec::new("remove_su", "remove_su <user>"),
    CommandSpec::new("save_config", "save_config"),
    CommandSpec::new("add_sudoer", "add_sudoer <user>"),
    CommandSpec::new("remove_sudoer", "remove_sudoer <user>"),
    CommandSpec::new("sudoers", "sudoers"),
    CommandSpec::new("loaded_extensions", "loaded_extensions"),
    CommandSpec::new("load_extension", "load_extension <module>"),
    CommandSpec::new("unload_extension", "unload_extension <module>"),
    CommandSpec::new("reload_extension", "reload_extension <module>"),
    CommandSpec::new("testing_mode", "testing_mode <on|off>"),
    CommandSpec::new("available_commands", "available_commands"),
    CommandSpec::new("shutdown", "shutdown"),
    CommandSpec::new("require_role", "require_role <module> <role>"),
    CommandSpec::new("require_sudo", "require_sudo <module>"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct AdminModule;

#[async_trait]
impl Module for AdminModule {
    fn name(&self) -> &str {
        ADMIN_MODULE
    }

    fn commands(&self) -> &[CommandSpec] {
        COMMANDS
    }

    async fn execute(
        &self,
        cx: &mut CommandContext<'_>,
        invocation: &Invocation,
    ) -> Result<String, CommandError> {
        match invocation.command() {
            "protect" => protect(cx, invocation).await,
            "unprotect" => unprotect(cx, invocation).await,
            "status" => Ok(status(cx)),
            "add_su" => add_su(cx, invocation).await,
            "remove_su" => remove_su(cx, invocation).await,
            "save_config" => {
                cx.persist().await?;
                Ok("Configuration saved".to_string())
            }
            "add_sudoer" => add_sudoer(cx, invocation).await,
            "remove_sudoer" => remove_sudoer(cx, invocation).await,
            "sudoers" => Ok(sudoers_line(cx)),
            "loaded_extensions" => Ok(cx.registry().names().join(", ")),
            "load_extension" => load_extension(cx, invocation),
            "unload_extension" => unload_extension(cx, invocation),
            "reload_extension" => reload_extension(cx, invocation),
            "testing_mode" => testing_mode(cx, invocation),
            "available_commands" => Ok(available_commands(cx)),
            "shutdown" => {
                cx.services().request_shutdown();
                Ok("Shutting down".to_string())
            }
            "require_role" => require_role(cx, invocation),
            "require_sudo" => require_sudo(cx, invocation),
            other => Err(CommandError::NotFound(format!("Unknown command {other}"))),
        }
    }
}

fn arg<'a>(invocation: &'a Invocation, index: usize, usage: &str) -> Result<&'a str, CommandError> {
    invocation.arg(index).ok_or_else(|| CommandError::usage(usage))
}

fn privileged_role(cx: &CommandContext<'_>) -> Result<Role, CommandError> {
    cx.policy
        .privileged_role()
        .cloned()
        .ok_or(CommandError::NotInWorkspace)
}

fn known_module(cx: &CommandContext<'_>, module: &str) -> Result<(), CommandError> {
    if cx.registry().exists(module) {
        Ok(())
    } else {
        Err(CommandError::module_not_found(module))
    }
}

async fn protect(cx: &mut CommandContext<'_>, invocation: &Invocation) -> Result<String, CommandError> {
    let module = arg(invocation, 0, "protect <module> [principal]")?;
    known_module(cx, module)?;
    cx.workspace()?;

    let (principal, label) = match invocation.arg(1) {
        Some(raw) => {
            let principal = resolve_principal(cx, raw).await?;
            (principal, principal.to_string())
        }
        None => {
            let role = privileged_role(cx)?;
            (Principal::Role(role.id), role.name)
        }
    };

    cx.policy.protections_mut().grant(module, principal);
    cx.persist().await?;
    Ok(format!("{module} is now protected to {label}"))
}

async fn unprotect(cx: &mut CommandContext<'_>, invocation: &Invocation) -> Result<String, CommandError> {
    let module = arg(invocation, 0, "unprotect <module> [principal]")?;
    known_module(cx, module)?;
    cx.workspace()?;

    if !cx.policy.protections().is_protected(module) {
        return Ok(format!("{module} has no protections"));
    }

    let (principal, label) = match invocation.arg(1) {
        Some(raw) => {
            let principal = resolve_principal(cx, raw).await?;
            (principal, principal.to_string())
        }
        None => {
            let role = privileged_role(cx)?;
            let principal = Principal::Role(role.id);
            if !cx.policy.protections().contains(module, &principal) {
                return Ok(format!("Please specify a group to protect {module} to"));
            }
            (principal, role.name)
        }
    };

    if module == ADMIN_MODULE && principal == Principal::User(cx.policy.owner()) {
        return Ok("The workspace owner cannot be removed from admin".to_string());
    }

    if !cx.policy.protections_mut().revoke(module, &principal) {
        return Ok(format!("{label} has no access to {module}"));
    }
    cx.persist().await?;
    Ok(format!("{module} is no longer protected to {label}"))
}

fn status(cx: &CommandContext<'_>) -> String {
    let protections = cx.policy.protections();
    let mut protected = Vec::new();
    let mut unprotected = Vec::new();

    for name in cx.registry().names() {
        match protections.get(&name) {
            Some(members) if members.is_empty() => protected.push(format!("{name}: nobody")),
            Some(members) => {
                let members: Vec<String> = members.iter().map(Principal::to_string).collect();
                protected.push(format!("{name}: {}", members.join(", ")));
            }
            None => unprotected.push(name),
        }
    }

    let mut lines = vec!["Protected modules:".to_string()];
    if protected.is_empty() {
        lines.push("none".to_string());
    }
    lines.extend(protected);
    lines.push(format!("Unprotected modules: {}", or_none(&unprotected)));
    lines.push(sudoers_line(cx));
    lines.join("\n")
}

fn sudoers_line(cx: &CommandContext<'_>) -> String {
    let sudoers: Vec<String> = cx
        .services()
        .sudoers
        .list()
        .into_iter()
        .map(|id| Principal::User(id).to_string())
        .collect();
    format!("Sudoers: {}", or_none(&sudoers))
}

fn or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

async fn add_su(cx: &mut CommandContext<'_>, invocation: &Invocation) -> Result<String, CommandError> {
    let raw = arg(invocation, 0, "add_su <user>")?;
    let tenant_id = cx.workspace()?;
    let role = privileged_role(cx)?;
    let user = resolve_user(cx, raw).await?;

    cx.services()
        .platform
        .assign_role(tenant_id, user.id, role.id)
        .await?;
    Ok(format!("{} is now a member of {}", user.name, role.name))
}

async fn remove_su(cx: &mut CommandContext<'_>, invocation: &Invocation) -> Result<String, CommandError> {
    let raw = arg(invocation, 0, "remove_su <user>")?;
    let tenant_id = cx.workspace()?;
    let role = privileged_role(cx)?;
    let user = resolve_user(cx, raw).await?;

    cx.services()
        .platform
        .unassign_role(tenant_id, user.id, role.id)
        .await?;
    Ok(format!("{} is no longer a member of {}", user.name, role.name))
}

async fn add_sudoer(cx: &mut CommandContext<'_>, invocation: &Invocation) -> Result<String, CommandError> {
    let user = resolve_user(cx, arg(invocation, 0, "add_sudoer <user>")?).await?;
    if cx.services().sudoers.insert(user.id) {
        Ok(format!("User {} was added to the sudoers.", user.name))
    } else {
        Ok(format!("User {} is already a sudoer", user.name))
    }
}

async fn remove_sudoer(cx: &mut CommandContext<'_>, invocation: &Invocation) -> Result<String, CommandError> {
    let user = resolve_user(cx, arg(invocation, 0, "remove_sudoer <user>")?).await?;
    if cx.services().sudoers.remove(user.id) {
        Ok(format!("User {} was removed from sudoers.", user.name))
    } else {
        Ok(format!("User {} is not a sudoer", user.name))
    }
}

fn load_extension(cx: &CommandContext<'_>, invocation: &Invocation) -> Result<String, CommandError> {
    let name = arg(invocation, 0, "load_extension <module>")?;
    let Some(module) = cx.services().catalog.instantiate(name) else {
        return Ok(format!("Could not load {name}"));
    };
    if cx.registry().load(module) {
        Ok(format!("{name} successfully loaded"))
    } else {
        Ok(format!("{name} is already loaded"))
    }
}

fn unload_extension(cx: &CommandContext<'_>, invocation: &Invocation) -> Result<String, CommandError> {
    let name = arg(invocation, 0, "unload_extension <module>")?;
    if name == ADMIN_MODULE {
        return Ok(format!("{ADMIN_MODULE} cannot be unloaded"));
    }
    match cx.registry().unload(name) {
        Some(_) => Ok(format!("{name} unloaded")),
        None => Ok(format!("Could not unload {name}")),
    }
}

fn reload_extension(cx: &CommandContext<'_>, invocation: &Invocation) -> Result<String, CommandError> {
    let name = arg(invocation, 0, "reload_extension <module>")?;
    if !cx.registry().exists(name) {
        return Ok("Extension could not be reloaded.".to_string());
    }
    let Some(module) = cx.services().catalog.instantiate(name) else {
        return Ok("Extension could not be reloaded.".to_string());
    };
    cx.registry().replace(module);
    Ok(format!("{name} reloaded."))
}

fn testing_mode(cx: &CommandContext<'_>, invocation: &Invocation) -> Result<String, CommandError> {
    let usage = "testing_mode <on|off>";
    let enable = match arg(invocation, 0, usage)?.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "enable" | "1" => true,
        "off" | "false" | "no" | "disable" | "0" => false,
        _ => return Err(CommandError::usage(usage)),
    };

    if enable {
        cx.registry().unload(SAFETY_MODULE);
        Ok("Testing mode enabled! Safety Checks removed.".to_string())
    } else {
        if let Some(module) = cx.services().catalog.instantiate(SAFETY_MODULE) {
            cx.registry().load(module);
        }
        Ok("Testing mode disabled. Safety Checks reinstated.".to_string())
    }
}

fn available_commands(cx: &CommandContext<'_>) -> String {
    let mut lines = Vec::new();
    for handle in cx.registry().handles() {
        lines.push(handle.name().to_string());
        lines.extend(handle.commands().iter().map(|c| format!("\t{}", c.usage)));
    }
    lines.join("\n")
}

fn require_role(cx: &CommandContext<'_>, invocation: &Invocation) -> Result<String, CommandError> {
    let usage = "require_role <module> <role>";
    let module = arg(invocation, 0, usage)?;
    let role = RoleIdentifier::parse(arg(invocation, 1, usage)?);

    let label = role.to_string();
    cx.registry()
        .wrap(module, Predicate::role(role))
        .map_err(|e| CommandError::NotFound(e.to_string()))?;
    Ok(format!("{module} now requires the {label} role"))
}

fn require_sudo(cx: &CommandContext<'_>, invocation: &Invocation) -> Result<String, CommandError> {
    let module = arg(invocation, 0, "require_sudo <module>")?;
    cx.registry()
        .wrap(module, Predicate::sudoer())
        .map_err(|e| CommandError::NotFound(e.to_string()))?;
    Ok(format!("{module} now requires sudo"))
}

/// `<@id>` or `<@!id>` (user mention) to a user id.
fn user_mention(raw: &str) -> Option<UserId> {
    let inner = raw.strip_prefix("<@")?.strip_suffix('>')?;
    inner.strip_prefix('!').unwrap_or(inner).parse().ok()
}

/// `<@&id>` (role mention) to a role id.
fn role_mention(raw: &str) -> Option<RoleId> {
    raw.strip_prefix("<@&")?.strip_suffix('>')?.parse().ok()
}

async fn resolve_user(cx: &CommandContext<'_>, raw: &str) -> Result<UserProfile, CommandError> {
    let not_found = || CommandError::NotFound(format!("Could not find user {raw}"));
    let user_id = user_mention(raw)
        .or_else(|| raw.parse().ok())
        .ok_or_else(not_found)?;

    let services = cx.services();
    with_timeout(
        services.config.lookup_timeout,
        services.platform.fetch_user(user_id),
    )
    .await
    .map_err(|_| not_found())
}

/// Resolve a principal argument.
///
/// Mentions are taken at face value. A bare number is a user if the
/// platform knows one, else a role of this workspace. Anything else must
/// name a role of this workspace.
async fn resolve_principal(cx: &CommandContext<'_>, raw: &str) -> Result<Principal, CommandError> {
    if raw.starts_with("<@&") {
        return role_mention(raw)
            .map(Principal::Role)
            .ok_or_else(|| CommandError::NotFound(format!("Could not find role {raw}")));
    }
    if let Some(user_id) = user_mention(raw) {
        return Ok(Principal::User(user_id));
    }

    let tenant_id = cx.workspace()?;
    let services = cx.services();
    let roles = RoleCatalog::new(services.platform.list_roles(tenant_id).await?);

    if let Ok(id) = raw.parse::<u64>() {
        let lookup = services.platform.fetch_user(UserId::new(id));
        if with_timeout(services.config.lookup_timeout, lookup).await.is_ok() {
            return Ok(Principal::User(UserId::new(id)));
        }
        if roles.contains(RoleId::new(id)) {
            return Ok(Principal::Role(RoleId::new(id)));
        }
    } else if let Some(role) = roles.by_name(raw) {
        return Ok(Principal::Role(role.id));
    }

    Err(CommandError::NotFound(format!("Could not find {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_mentions() {
        assert_eq!(user_mention("<@42>"), Some(UserId::new(42)));
        assert_eq!(user_mention("<@!42>"), Some(UserId::new(42)));
        assert_eq!(user_mention("<@&42>"), None);
        assert_eq!(user_mention("42"), None);
    }

    #[test]
    fn parses_role_mentions() {
        assert_eq!(role_mention("<@&7>"), Some(RoleId::new(7)));
        assert_eq!(role_mention("<@7>"), None);
    }

    #[test]
    fn admin_lists_every_command() {
        let names: Vec<&str> = AdminModule.commands().iter().map(|c| c.name).collect();
        for expected in ["protect", "unprotect", "status", "require_role", "require_sudo", "shutdown"] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }
}

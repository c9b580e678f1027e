use async_trait::async_trait;

use warden_events::Invocation;

use crate::context::CommandContext;
use crate::error::CommandError;
use crate::module::{CommandSpec, Module};

pub const UTILITY_MODULE: &str = "utility";

const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new("ping", "ping"),
    CommandSpec::new("echo", "echo <text...>"),
];

/// Small commands with no state, handy for checking protections end to end.
#[derive(Debug, Default, Clone, Copy)]
pub struct UtilityModule;

#[async_trait]
impl Module for UtilityModule {
    fn name(&self) -> &str {
        UTILITY_MODULE
    }

    fn commands(&self) -> &[CommandSpec] {
        COMMANDS
    }

    async fn execute(
        &self,
        _cx: &mut CommandContext<'_>,
        invocation: &Invocation,
    ) -> Result<String, CommandError> {
        match invocation.command() {
            "ping" => Ok("pong".to_string()),
            "echo" if !invocation.args().is_empty() => Ok(invocation.args().join(" ")),
            "echo" => Err(CommandError::usage("echo <text...>")),
            other => Err(CommandError::NotFound(format!("Unknown command {other}"))),
        }
    }
}

use async_trait::async_trait;

use warden_events::{InboundEvent, Invocation};

use crate::context::CommandContext;
use crate::error::CommandError;
use crate::module::{CommandSpec, Module};

pub const SAFETY_MODULE: &str = "safety";

/// Keeps the bot from answering other bots while it is loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct SafetyModule;

#[async_trait]
impl Module for SafetyModule {
    fn name(&self) -> &str {
        SAFETY_MODULE
    }

    fn commands(&self) -> &[CommandSpec] {
        &[]
    }

    fn allows(&self, event: &InboundEvent) -> bool {
        !event.author().is_bot
    }

    async fn execute(
        &self,
        _cx: &mut CommandContext<'_>,
        invocation: &Invocation,
    ) -> Result<String, CommandError> {
        Err(CommandError::NotFound(format!(
            "Unknown command {}",
            invocation.command()
        )))
    }
}

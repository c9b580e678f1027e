use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{ChannelId, MessageId, TenantId, UserId};

/// Where a message was posted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// A text channel inside a workspace.
    #[default]
    Workspace,
    /// A direct message with the bot (no workspace).
    Direct,
}

/// The account that authored a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    /// Other bots and webhooks set this; the safety filter rejects them.
    #[serde(default)]
    pub is_bot: bool,
}

impl Author {
    pub fn user(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_bot: false,
        }
    }

    pub fn bot(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_bot: true,
        }
    }
}

/// A message received from the chat gateway.
///
/// Notes:
/// - **Multi-tenancy** is carried by `workspace_id`; `None` means the message
///   arrived outside any workspace (a direct message).
/// - The payload is the raw message text; command parsing happens later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(default)]
    message_id: MessageId,
    #[serde(default)]
    workspace_id: Option<TenantId>,
    channel_id: ChannelId,
    #[serde(default)]
    channel_kind: ChannelKind,
    author: Author,
    content: String,
    #[serde(default = "Utc::now")]
    sent_at: DateTime<Utc>,
}

impl InboundEvent {
    pub fn new(
        message_id: MessageId,
        workspace_id: Option<TenantId>,
        channel_id: ChannelId,
        channel_kind: ChannelKind,
        author: Author,
        content: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            message_id,
            workspace_id,
            channel_id,
            channel_kind,
            author,
            content: content.into(),
            sent_at,
        }
    }

    /// A message posted in a workspace text channel.
    pub fn in_workspace(
        workspace_id: TenantId,
        channel_id: ChannelId,
        author: Author,
        content: impl Into<String>,
    ) -> Self {
        Self::new(
            MessageId::default(),
            Some(workspace_id),
            channel_id,
            ChannelKind::Workspace,
            author,
            content,
            Utc::now(),
        )
    }

    /// A direct message to the bot.
    pub fn direct(channel_id: ChannelId, author: Author, content: impl Into<String>) -> Self {
        Self::new(
            MessageId::default(),
            None,
            channel_id,
            ChannelKind::Direct,
            author,
            content,
            Utc::now(),
        )
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn workspace_id(&self) -> Option<TenantId> {
        self.workspace_id
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn channel_kind(&self) -> ChannelKind {
        self.channel_kind
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_gateway_line() {
        let line = r#"{"workspace_id":10,"channel_id":3,"author":{"id":5},"content":"$status"}"#;
        let event: InboundEvent = serde_json::from_str(line).unwrap();

        assert_eq!(event.workspace_id(), Some(TenantId::new(10)));
        assert_eq!(event.channel_kind(), ChannelKind::Workspace);
        assert_eq!(event.author().id, UserId::new(5));
        assert!(!event.author().is_bot);
        assert_eq!(event.content(), "$status");
    }

    #[test]
    fn direct_messages_have_no_workspace() {
        let event = InboundEvent::direct(ChannelId::new(1), Author::user(UserId::new(2), "dm"), "hi");
        assert_eq!(event.workspace_id(), None);
        assert_eq!(event.channel_kind(), ChannelKind::Direct);
    }
}

/// Command dispatch: route detected commands to handlers.
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use mango_core::VoiceTarget;
use tracing::{debug, info};

use crate::types::{Attachment, CommandInvocation};

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

/// Context passed to every command handler.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// `None` for direct messages.
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub author_id: u64,
    pub author_name: String,
    /// Voice channel the author currently sits in, if any.
    pub voice_channel_id: Option<u64>,
    pub attachments: Vec<Attachment>,
}

impl CommandContext {
    /// Where playback for this requester should go.
    pub fn voice_target(&self) -> Option<VoiceTarget> {
        Some(VoiceTarget::new(self.guild_id?, self.voice_channel_id?))
    }
}

/// Replies to post back into the originating text channel, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResponse {
    pub messages: Vec<String>,
}

impl CommandResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            messages: vec![text.into()],
        }
    }

    /// Handled, but nothing to say.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: impl Into<String>) {
        self.messages.push(text.into());
    }

    pub fn is_silent(&self) -> bool {
        self.messages.is_empty()
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: &CommandContext, inv: &CommandInvocation) -> Result<CommandResponse>;
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct CommandDispatcher {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, key: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(key.into(), handler);
    }

    pub async fn dispatch(
        &self,
        ctx: &CommandContext,
        inv: &CommandInvocation,
    ) -> Result<CommandResponse> {
        if let Some(handler) = self.handlers.get(inv.key()) {
            info!(
                command = inv.key(),
                author = %ctx.author_name,
                channel = ctx.channel_id,
                "Dispatching command"
            );
            handler.handle(ctx, inv).await
        } else {
            debug!(command = inv.key(), "No handler registered");
            Ok(CommandResponse::silent())
        }
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BuiltinCommand;

    struct Echo;

    #[async_trait]
    impl CommandHandler for Echo {
        async fn handle(&self, ctx: &CommandContext, inv: &CommandInvocation) -> Result<CommandResponse> {
            Ok(CommandResponse::ok(format!("{} from {}", inv.key(), ctx.author_name)))
        }
    }

    fn ctx() -> CommandContext {
        CommandContext {
            guild_id: Some(1),
            channel_id: 2,
            author_id: 3,
            author_name: "mango".into(),
            voice_channel_id: None,
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn routes_by_invocation_key() {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register("help", Arc::new(Echo));

        let inv = CommandInvocation::Builtin {
            command: BuiltinCommand::Help,
            raw_args: String::new(),
        };
        let resp = dispatcher.dispatch(&ctx(), &inv).await.unwrap();
        assert_eq!(resp.messages, vec!["help from mango".to_string()]);
    }

    #[tokio::test]
    async fn unhandled_command_is_silent() {
        let dispatcher = CommandDispatcher::default();
        let inv = CommandInvocation::Sound {
            token: "!airhorn".into(),
        };
        let resp = dispatcher.dispatch(&ctx(), &inv).await.unwrap();
        assert!(resp.is_silent());
    }

    #[test]
    fn voice_target_needs_guild_and_channel() {
        let mut c = ctx();
        assert_eq!(c.voice_target(), None);
        c.voice_channel_id = Some(9);
        assert_eq!(c.voice_target(), Some(VoiceTarget::new(1, 9)));
        c.guild_id = None;
        assert_eq!(c.voice_target(), None);
    }
}

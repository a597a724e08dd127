use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use mango_commands::{Attachment, CommandContext};
use mango_logging::redact_secrets;
use mango_soundboard::Soundboard;
use serenity::gateway::ActivityData;
use serenity::model::channel::{Attachment as DiscordAttachment, Message as DiscordMessage};
use serenity::model::gateway::Ready;
use serenity::model::guild::Guild;
use serenity::model::id::{GuildId, UserId};
use serenity::prelude::*;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::ChannelAdapter;
use crate::voice::VoiceBackend;

/// Gateway events the soundboard needs: guild and voice-state caches to find
/// the caller's channel, and message content to read commands.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

struct Handler {
    soundboard: Arc<Soundboard>,
    status: String,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: DiscordMessage) {
        if msg.author.bot {
            return;
        }
        let Some(invocation) = self.soundboard.detect(&msg.content) else {
            return;
        };

        let command_ctx = command_context(&ctx, &msg);
        debug!(
            command = invocation.key(),
            author = %command_ctx.author_name,
            channel = command_ctx.channel_id,
            "Received command"
        );

        let response = match self.soundboard.dispatch(&command_ctx, &invocation).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %redact_secrets(&format!("{e:#}")), "Command failed");
                return;
            }
        };
        for text in response.messages {
            if let Err(e) = msg.channel_id.say(&ctx.http, text).await {
                error!(channel = %msg.channel_id, error = ?e, "Error sending message");
            }
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        ctx.set_activity(Some(ActivityData::playing(self.status.clone())));
        info!(
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            status = %self.status,
            "Connected to Discord"
        );
    }

    async fn guild_create(&self, _ctx: Context, guild: Guild, is_new: Option<bool>) {
        info!(guild = %guild.name, id = %guild.id, new = ?is_new, "Guild available");
    }
}

/// Snapshot of everything a handler needs from a Discord message.
fn command_context(ctx: &Context, msg: &DiscordMessage) -> CommandContext {
    CommandContext {
        guild_id: msg.guild_id.map(|g| g.get()),
        channel_id: msg.channel_id.get(),
        author_id: msg.author.id.get(),
        author_name: msg.author.name.clone(),
        voice_channel_id: msg
            .guild_id
            .and_then(|guild_id| voice_channel_of(ctx, guild_id, msg.author.id)),
        attachments: msg.attachments.iter().map(to_attachment).collect(),
    }
}

/// The voice channel `user` is sitting in, from the cached voice states.
fn voice_channel_of(ctx: &Context, guild_id: GuildId, user: UserId) -> Option<u64> {
    let guild = ctx.cache.guild(guild_id)?;
    guild.voice_states.get(&user)?.channel_id.map(|c| c.get())
}

fn to_attachment(a: &DiscordAttachment) -> Attachment {
    Attachment {
        filename: a.filename.clone(),
        url: a.url.clone(),
        size: u64::from(a.size),
    }
}

pub struct DiscordAdapter {
    token: String,
    status: String,
    soundboard: Arc<Soundboard>,
    voice: VoiceBackend,
}

impl DiscordAdapter {
    pub fn new(
        token: impl Into<String>,
        status: impl Into<String>,
        soundboard: Arc<Soundboard>,
        voice: &VoiceBackend,
    ) -> Self {
        Self {
            token: token.into(),
            status: status.into(),
            soundboard,
            voice: voice.clone(),
        }
    }
}

#[async_trait]
impl ChannelAdapter for DiscordAdapter {
    fn name(&self) -> &str {
        "discord"
    }

    async fn start(&self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        info!(voice = self.voice.name(), "Starting Discord adapter");

        let handler = Handler {
            soundboard: self.soundboard.clone(),
            status: self.status.clone(),
        };
        let builder = Client::builder(&self.token, intents()).event_handler(handler);
        #[cfg(feature = "voice-songbird")]
        let builder = {
            use songbird::SerenityInit;
            builder.register_songbird_with(self.voice.songbird())
        };
        let mut client = builder.await.context("Failed to build Discord client")?;

        let shard_manager = client.shard_manager.clone();
        tokio::spawn(async move {
            if shutdown.wait_for(|stop| *stop).await.is_ok() {
                info!("Shutting down Discord shards");
                shard_manager.shutdown_all().await;
            }
        });

        if let Err(why) = client.start().await {
            error!(error = ?why, "Client error");
            anyhow::bail!("Discord client error: {why}");
        }
        info!("Discord adapter stopped");
        Ok(())
    }
}

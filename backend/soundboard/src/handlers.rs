//! Handlers for `!help`, `!newsound`, and sound playback.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use mango_commands::{CommandContext, CommandHandler, CommandInvocation, CommandResponse, SoundTable};
use mango_core::{SoundError, SoundEvent, SoundEventKind, VoiceGateway};
use mango_logging::EventLogger;
use mango_media::dca;
use mango_player::Player;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::ingest::Ingestor;
use crate::library::Library;

/// Discord rejects messages longer than this.
pub const MESSAGE_LIMIT: usize = 2000;

async fn refresh(library: &Library, rescan: bool) {
    if !rescan {
        return;
    }
    match library.rebuild().await {
        Ok(report) => {
            if report.converted > 0 {
                EventLogger::log(&SoundEvent::new(
                    SoundEventKind::LibraryRebuilt,
                    "",
                    json!(report),
                ));
            }
        }
        Err(e) => warn!(error = %e, "Library rebuild failed; serving the previous table"),
    }
}

// ---------------------------------------------------------------------------
// !help
// ---------------------------------------------------------------------------

pub struct HelpHandler {
    pub library: Arc<Library>,
    pub rescan: bool,
}

/// The `!help` reply, split into chunks that fit in one message each.
pub fn help_messages(table: &SoundTable) -> Vec<String> {
    let marker = table.marker();
    let header = format!("Upload audio with {marker}newsound to add a sound.");
    if table.is_empty() {
        return vec![format!("{header}\nNo sounds yet.")];
    }

    let mut messages = Vec::new();
    let mut current = format!("{header}\nYou can ask me to play the following sounds:\n");
    let mut first = true;
    for command in table.commands() {
        let sep = if first { "" } else { ", " };
        if current.len() + sep.len() + command.len() > MESSAGE_LIMIT {
            messages.push(std::mem::take(&mut current));
            current.push_str(command);
        } else {
            current.push_str(sep);
            current.push_str(command);
        }
        first = false;
    }
    messages.push(current);
    messages
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn handle(&self, _ctx: &CommandContext, _inv: &CommandInvocation) -> Result<CommandResponse> {
        refresh(&self.library, self.rescan).await;
        let table = self.library.snapshot().await;
        Ok(CommandResponse {
            messages: help_messages(&table),
        })
    }
}

// ---------------------------------------------------------------------------
// !newsound
// ---------------------------------------------------------------------------

pub struct NewSoundHandler {
    pub ingestor: Arc<Ingestor>,
    pub marker: char,
}

#[async_trait]
impl CommandHandler for NewSoundHandler {
    async fn handle(&self, ctx: &CommandContext, _inv: &CommandInvocation) -> Result<CommandResponse> {
        if ctx.attachments.is_empty() {
            return Ok(CommandResponse::ok(format!(
                "Attach one or more audio files to a {}newsound message to add them as sounds.",
                self.marker
            )));
        }

        let mut response = CommandResponse::silent();
        for attachment in &ctx.attachments {
            match self.ingestor.ingest(attachment).await {
                Ok(outcome) => {
                    EventLogger::log(&SoundEvent::new(
                        SoundEventKind::SoundAdded,
                        &outcome.command,
                        json!({ "author": ctx.author_name, "file": attachment.filename, "bytes": outcome.bytes }),
                    ));
                    response.push(format!("Successfully added {}", outcome.command));
                }
                Err(e) => {
                    warn!(file = %attachment.filename, author = %ctx.author_name, error = %e, "Upload rejected");
                    EventLogger::log(&SoundEvent::new(
                        SoundEventKind::IngestFailed,
                        "",
                        json!({ "author": ctx.author_name, "file": attachment.filename, "error": e.to_string() }),
                    ));
                    response.push(match e {
                        SoundError::DuplicateCommand(command) => format!("{command} is already a command!"),
                        other => format!("Could not add {}: {other}", attachment.filename),
                    });
                }
            }
        }
        Ok(response)
    }
}

// ---------------------------------------------------------------------------
// !<sound>
// ---------------------------------------------------------------------------

pub struct PlayHandler {
    pub library: Arc<Library>,
    pub player: Arc<Player>,
    pub gateway: Arc<dyn VoiceGateway>,
    pub rescan: bool,
}

#[async_trait]
impl CommandHandler for PlayHandler {
    async fn handle(&self, ctx: &CommandContext, inv: &CommandInvocation) -> Result<CommandResponse> {
        let CommandInvocation::Sound { token } = inv else {
            return Ok(CommandResponse::silent());
        };

        // Known sounds play straight from the current table; only a miss
        // is worth a trip to disk.
        let path = match self.library.lookup(token).await {
            Some(path) => path,
            None => {
                refresh(&self.library, self.rescan).await;
                let Some(path) = self.library.lookup(token).await else {
                    debug!(token = %token, "Not a known sound");
                    return Ok(CommandResponse::silent());
                };
                path
            }
        };
        let Some(target) = ctx.voice_target() else {
            info!(token = %token, author = %ctx.author_name, "{}", SoundError::NotInVoiceChannel);
            return Ok(CommandResponse::silent());
        };
        if self.player.is_busy() {
            debug!(token = %token, "Ignoring request; already playing");
            EventLogger::log(&SoundEvent::new(SoundEventKind::PlaybackRejected, token, json!({ "target": target })));
            return Ok(CommandResponse::silent());
        }

        let frames = match dca::decode(&path).await {
            Ok(frames) => frames,
            Err(e) => {
                warn!(token = %token, path = %path.display(), error = %e, "Sound file unreadable");
                EventLogger::log(&SoundEvent::new(
                    SoundEventKind::PlaybackFailed,
                    token,
                    json!({ "target": target, "error": e.to_string() }),
                ));
                return Ok(CommandResponse::ok(format!("Could not play {token}: {e}")));
            }
        };

        EventLogger::log(&SoundEvent::new(
            SoundEventKind::PlaybackStarted,
            token,
            json!({ "target": target, "author": ctx.author_name, "frames": frames.len() }),
        ));
        match self.player.play(self.gateway.as_ref(), target, frames).await {
            Ok(report) => {
                EventLogger::log(&SoundEvent::new(SoundEventKind::PlaybackFinished, token, json!(report)));
                Ok(CommandResponse::silent())
            }
            Err(SoundError::PlaybackBusy) => {
                EventLogger::log(&SoundEvent::new(SoundEventKind::PlaybackRejected, token, json!({ "target": target })));
                Ok(CommandResponse::silent())
            }
            Err(e) => {
                warn!(token = %token, target = %target, error = %e, "Playback failed");
                EventLogger::log(&SoundEvent::new(
                    SoundEventKind::PlaybackFailed,
                    token,
                    json!({ "target": target, "error": e.to_string() }),
                ));
                Ok(CommandResponse::ok(format!("Could not play {token}: {e}")))
            }
        }
    }
}

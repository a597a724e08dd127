//! The soundboard service object the chat adapter talks to.

use std::sync::Arc;

use anyhow::Result;
use mango_commands::{
    BuiltinCommand, CommandContext, CommandDispatcher, CommandInvocation, CommandResponse, detect_command,
};
use mango_core::{SoundEvent, SoundEventKind, SoundResult, VoiceGateway};
use mango_logging::EventLogger;
use mango_media::{Downloader, Normalizer, Transcoder};
use mango_player::{Player, PlayerConfig};
use serde_json::json;

use crate::handlers::{HelpHandler, NewSoundHandler, PlayHandler};
use crate::ingest::Ingestor;
use crate::library::{Library, LibraryPaths, RebuildReport};

#[derive(Debug, Clone)]
pub struct SoundboardSettings {
    pub marker: char,
    pub paths: LibraryPaths,
    /// Rebuild the library before serving each command.
    pub rescan_on_command: bool,
    pub player: PlayerConfig,
}

impl Default for SoundboardSettings {
    fn default() -> Self {
        Self {
            marker: mango_commands::DEFAULT_MARKER,
            paths: LibraryPaths::default(),
            rescan_on_command: true,
            player: PlayerConfig::default(),
        }
    }
}

pub struct Soundboard {
    settings: SoundboardSettings,
    library: Arc<Library>,
    player: Arc<Player>,
    dispatcher: CommandDispatcher,
}

impl Soundboard {
    pub fn new(
        settings: SoundboardSettings,
        transcoder: Arc<dyn Transcoder>,
        downloader: Downloader,
        gateway: Arc<dyn VoiceGateway>,
    ) -> Self {
        let normalizer = Arc::new(Normalizer::new(transcoder));
        let library = Arc::new(Library::new(settings.paths.clone(), settings.marker, normalizer));
        let player = Arc::new(Player::new(settings.player));
        let ingestor = Arc::new(Ingestor::new(library.clone(), downloader));

        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register(
            BuiltinCommand::Help.name(),
            Arc::new(HelpHandler {
                library: library.clone(),
                rescan: settings.rescan_on_command,
            }),
        );
        dispatcher.register(
            BuiltinCommand::NewSound.name(),
            Arc::new(NewSoundHandler {
                ingestor,
                marker: settings.marker,
            }),
        );
        dispatcher.register(
            "play",
            Arc::new(PlayHandler {
                library: library.clone(),
                player: player.clone(),
                gateway,
                rescan: settings.rescan_on_command,
            }),
        );

        Self {
            settings,
            library,
            player,
            dispatcher,
        }
    }

    pub fn settings(&self) -> &SoundboardSettings {
        &self.settings
    }

    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }

    pub fn player(&self) -> &Arc<Player> {
        &self.player
    }

    /// Create the sound directories and load the library.
    pub async fn start(&self) -> SoundResult<RebuildReport> {
        self.library.ensure_dirs().await?;
        let report = self.library.rebuild().await?;
        EventLogger::log(&SoundEvent::new(SoundEventKind::LibraryRebuilt, "", json!(report)));
        Ok(report)
    }

    pub fn detect(&self, text: &str) -> Option<CommandInvocation> {
        detect_command(text, self.settings.marker)
    }

    pub async fn dispatch(&self, ctx: &CommandContext, inv: &CommandInvocation) -> Result<CommandResponse> {
        self.dispatcher.dispatch(ctx, inv).await
    }

    /// Detect and dispatch in one step. `None` for ordinary chatter.
    pub async fn handle_message(&self, ctx: &CommandContext, text: &str) -> Result<Option<CommandResponse>> {
        match self.detect(text) {
            Some(inv) => Ok(Some(self.dispatch(ctx, &inv).await?)),
            None => Ok(None),
        }
    }
}

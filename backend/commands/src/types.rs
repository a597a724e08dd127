/// Command types shared by detection, the sound table, and dispatch.
use serde::{Deserialize, Serialize};

/// Sigil every chat command starts with.
pub const DEFAULT_MARKER: char = '!';

// ---------------------------------------------------------------------------
// Built-ins
// ---------------------------------------------------------------------------

/// Commands the bot answers itself; sound names may never shadow them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinCommand {
    Help,
    NewSound,
}

impl BuiltinCommand {
    pub const ALL: [BuiltinCommand; 2] = [BuiltinCommand::Help, BuiltinCommand::NewSound];

    /// Name without the marker.
    pub fn name(self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::NewSound => "newsound",
        }
    }

    /// Case-insensitive lookup by bare name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(name))
    }
}

// ---------------------------------------------------------------------------
// Parsed invocation
// ---------------------------------------------------------------------------

/// A marker-prefixed message, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandInvocation {
    Builtin {
        command: BuiltinCommand,
        /// Text after the command word.
        raw_args: String,
    },
    /// Anything else; resolved against the sound table at dispatch time.
    Sound {
        /// First word of the message, marker included (e.g. `!airhorn`).
        token: String,
    },
}

impl CommandInvocation {
    /// Dispatcher key for the handler that serves this invocation.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Builtin { command, .. } => command.name(),
            Self::Sound { .. } => "play",
        }
    }
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

/// A file uploaded alongside a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
    /// Size in bytes as reported by the platform.
    pub size: u64,
}

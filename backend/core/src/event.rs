use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An audit record of something the soundboard did on a user's behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: SoundEventKind,
    /// Command token the event concerns (e.g. `!airhorn`), empty for library-wide events
    pub command: String,
    pub payload: serde_json::Value,
}

/// Categories of soundboard events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SoundEventKind {
    /// A clip started streaming
    PlaybackStarted,
    /// A clip finished and the voice connection was released
    PlaybackFinished,
    /// A clip failed mid-way (join failure, stalled sink, ...)
    PlaybackFailed,
    /// A request arrived while another playback held the lock
    PlaybackRejected,
    /// An uploaded attachment was registered as a new command
    SoundAdded,
    /// An upload could not be downloaded, encoded, or registered
    IngestFailed,
    /// The command table was rebuilt from disk
    LibraryRebuilt,
}

impl SoundEvent {
    pub fn new(kind: SoundEventKind, command: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
            command: command.into(),
            payload,
        }
    }
}

impl std::fmt::Display for SoundEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}

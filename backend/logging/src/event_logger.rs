//! Sound Event Logger
//!
//! Playback and library events written to the `sound_events` target, which
//! lands in the rolling NDJSON log when file output is enabled.

use mango_core::SoundEvent;
use tracing::info;

use crate::redact::redact_secrets;

pub const EVENT_TARGET: &str = "sound_events";

pub struct EventLogger;

impl EventLogger {
    /// Record `event`, scrubbing secrets from its payload first.
    pub fn log(event: &SoundEvent) {
        let payload = Self::render_payload(event);
        info!(
            target: EVENT_TARGET,
            id = %event.id,
            kind = %event.kind,
            command = %event.command,
            payload = %payload,
            "Sound event"
        );
    }

    fn render_payload(event: &SoundEvent) -> String {
        redact_secrets(&event.payload.to_string())
    }
}

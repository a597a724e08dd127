//! Structured logging for rocket-mango.
//!
//! Console output plus an optional daily-rotated NDJSON file, secret
//! scrubbing, and the `sound_events` audit trail.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::EventLogger;
pub use logger::{LogOptions, init_logger};
pub use redact::{mask_secret, redact_secrets};

//! rocket-mango soundboard: the sound library, attachment ingest, and the
//! handlers behind `!help`, `!newsound`, and `!<sound>`.

pub mod handlers;
pub mod ingest;
pub mod library;
pub mod service;

#[cfg(test)]
mod testing;

pub use handlers::{HelpHandler, NewSoundHandler, PlayHandler, help_messages};
pub use ingest::{IngestOutcome, Ingestor};
pub use library::{Library, LibraryPaths, RebuildReport};
pub use service::{Soundboard, SoundboardSettings};

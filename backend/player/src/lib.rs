//! Voice playback for rocket-mango: a process-wide busy lock around a
//! join / stream / leave sequence.

pub mod player;

pub use player::{PlaybackReport, Player, PlayerConfig};

pub mod error;
pub mod event;
pub mod traits;
pub mod types;

pub use error::{SoundError, SoundResult};
pub use event::{SoundEvent, SoundEventKind};
pub use traits::{VoiceConnection, VoiceGateway};
pub use types::{Frame, PlaybackState, VoiceTarget};

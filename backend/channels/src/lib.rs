use async_trait::async_trait;
use tokio::sync::watch;

pub mod discord;
pub mod voice;
#[cfg(feature = "voice-songbird")]
pub mod voice_songbird;

pub use discord::DiscordAdapter;
pub use voice::{UnavailableVoice, VoiceBackend};

/// All chat platform adapters implement this trait.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Human-readable adapter name for logging.
    fn name(&self) -> &str;

    /// Connect and serve events until the platform disconnects or
    /// `shutdown` flips to `true`.
    async fn start(&self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()>;
}

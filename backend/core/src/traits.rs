use anyhow::Result;
use async_trait::async_trait;

use crate::types::{Frame, VoiceTarget};

/// An established voice session on the chat platform.
///
/// The transport (gateway voice handshake, RTP, encryption) belongs to the
/// implementation; rocket-mango only signals speaking state and pushes
/// pre-encoded frames in order.
#[async_trait]
pub trait VoiceConnection: Send {
    /// Signal start (`true`) or end (`false`) of audio.
    async fn set_speaking(&mut self, speaking: bool) -> Result<()>;

    /// Submit one frame to the transport's send sink.
    ///
    /// May wait while the sink is backpressured; the caller bounds the wait.
    async fn send_frame(&mut self, frame: Frame) -> Result<()>;

    /// Leave the voice channel and release the session.
    async fn disconnect(&mut self) -> Result<()>;
}

/// Factory for voice sessions (songbird, a test double, ...).
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Join the target voice channel.
    async fn join(&self, target: VoiceTarget) -> Result<Box<dyn VoiceConnection>>;
}

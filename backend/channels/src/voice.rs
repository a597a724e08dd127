//! Voice backends.
//!
//! The transport itself (voice gateway handshake, RTP, encryption) is
//! songbird's job and is only compiled in with the `voice-songbird` feature.
//! Without it every join fails with an explanatory error, so the rest of the
//! bot (help, uploads, conversion) still works.

use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use mango_core::{VoiceConnection, VoiceGateway, VoiceTarget};

/// Stand-in gateway for builds without a voice transport.
pub struct UnavailableVoice;

#[async_trait]
impl VoiceGateway for UnavailableVoice {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn join(&self, target: VoiceTarget) -> Result<Box<dyn VoiceConnection>> {
        bail!("cannot join {target}: voice transport not compiled in; rebuild with --features voice-songbird")
    }
}

/// The voice gateway handed to the soundboard, plus whatever the Discord
/// client has to register for it to work.
#[derive(Clone)]
pub struct VoiceBackend {
    gateway: Arc<dyn VoiceGateway>,
    #[cfg(feature = "voice-songbird")]
    manager: Arc<songbird::Songbird>,
}

impl VoiceBackend {
    #[cfg(feature = "voice-songbird")]
    pub fn new() -> Self {
        let manager = songbird::Songbird::serenity();
        let gateway = crate::voice_songbird::SongbirdGateway::new(manager.clone(), std::env::temp_dir());
        Self {
            gateway: Arc::new(gateway),
            manager,
        }
    }

    #[cfg(not(feature = "voice-songbird"))]
    pub fn new() -> Self {
        Self {
            gateway: Arc::new(UnavailableVoice),
        }
    }

    pub fn gateway(&self) -> Arc<dyn VoiceGateway> {
        self.gateway.clone()
    }

    pub fn name(&self) -> &str {
        self.gateway.name()
    }

    pub fn is_available(&self) -> bool {
        cfg!(feature = "voice-songbird")
    }

    #[cfg(feature = "voice-songbird")]
    pub(crate) fn songbird(&self) -> Arc<songbird::Songbird> {
        self.manager.clone()
    }
}

impl Default for VoiceBackend {
    fn default() -> Self {
        Self::new()
    }
}

//! Voice playback over songbird.
//!
//! songbird owns the transport and its own 20 ms pacing, so the connection
//! collects the frames the player submits and hands them over as one DCA1
//! track when speaking ends. Songbird's DCA reader needs the DCA1 header,
//! which the bare frame files don't carry; it is prepended on the fly.
//!
//! Completion comes from songbird's track events. A finished track is
//! dropped from the mixer straight away, so its handle cannot be polled for
//! an end state.

use std::num::NonZeroU64;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use mango_core::{Frame, VoiceConnection, VoiceGateway, VoiceTarget};
use mango_media::dca::FRAME_DURATION_MS;
use mango_media::encode_to_vec;
use serde_json::json;
use serenity::model::id::{ChannelId, GuildId};
use songbird::events::{Event, EventContext, EventHandler as VoiceEventHandler, TrackEvent};
use songbird::input::{File as FileInput, Input};
use songbird::tracks::ControlError;
use songbird::{Call, Songbird};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};

const DCA1_MAGIC: &[u8; 4] = b"DCA1";
/// Slack on top of the clip length before a track is treated as stuck.
const TRACK_GRACE: Duration = Duration::from_secs(5);

/// How a track left the mixer: `Ok` when it played out, `Err` with the
/// reason when it failed.
type TrackOutcome = std::result::Result<(), String>;

/// Reports the first end or error event of a track through a oneshot.
struct TrackDone {
    errored: bool,
    tx: Arc<StdMutex<Option<oneshot::Sender<TrackOutcome>>>>,
}

#[async_trait]
impl VoiceEventHandler for TrackDone {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let outcome = if self.errored {
            let reason = match ctx {
                EventContext::Track(tracks) => tracks
                    .first()
                    .map(|(state, _)| format!("{:?}", state.playing))
                    .unwrap_or_else(|| "unknown playback error".to_string()),
                _ => "unknown playback error".to_string(),
            };
            Err(reason)
        } else {
            Ok(())
        };
        let tx = self.tx.lock().ok().and_then(|mut slot| slot.take());
        if let Some(tx) = tx {
            let _ = tx.send(outcome);
        }
        Some(Event::Cancel)
    }
}

/// Wait for a track's outcome, giving up after `limit`.
///
/// A sender dropped without a word means songbird tore the track down with
/// the call; there is nothing left playing, so that counts as done.
async fn wait_for_track(rx: oneshot::Receiver<TrackOutcome>, limit: Duration) -> Result<()> {
    match tokio::time::timeout(limit, rx).await {
        Ok(Ok(Ok(()))) | Ok(Err(_)) => Ok(()),
        Ok(Ok(Err(reason))) => Err(anyhow!("track failed: {reason}")),
        Err(_) => Err(anyhow!("track did not finish within {limit:?}")),
    }
}

pub struct SongbirdGateway {
    manager: Arc<Songbird>,
    spool_dir: PathBuf,
}

impl SongbirdGateway {
    pub fn new(manager: Arc<Songbird>, spool_dir: PathBuf) -> Self {
        Self { manager, spool_dir }
    }
}

fn nonzero(id: u64, what: &str) -> Result<NonZeroU64> {
    NonZeroU64::new(id).ok_or_else(|| anyhow!("{what} id must be non-zero"))
}

#[async_trait]
impl VoiceGateway for SongbirdGateway {
    fn name(&self) -> &str {
        "songbird"
    }

    async fn join(&self, target: VoiceTarget) -> Result<Box<dyn VoiceConnection>> {
        let guild_id = GuildId::from(nonzero(target.guild_id, "guild")?);
        let channel_id = ChannelId::from(nonzero(target.channel_id, "channel")?);
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| anyhow!("songbird join {target}: {e}"))?;
        Ok(Box::new(SongbirdConnection {
            manager: self.manager.clone(),
            guild_id,
            call,
            spool: self.spool_dir.join(format!("rocket-mango-{}.dca", target.guild_id)),
            pending: Vec::new(),
        }))
    }
}

struct SongbirdConnection {
    manager: Arc<Songbird>,
    guild_id: GuildId,
    call: Arc<Mutex<Call>>,
    spool: PathBuf,
    pending: Vec<Frame>,
}

impl SongbirdConnection {
    async fn play_pending(&mut self) -> Result<()> {
        let frames = std::mem::take(&mut self.pending);
        let mut bytes = dca1_header()?;
        bytes.extend(encode_to_vec(&frames)?);
        tokio::fs::write(&self.spool, &bytes)
            .await
            .with_context(|| format!("write {}", self.spool.display()))?;

        let input: Input = FileInput::new(self.spool.clone()).into();
        let handle = self.call.lock().await.play_input(input);

        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(StdMutex::new(Some(tx)));
        let mut finished_early = false;
        for (event, errored) in [(TrackEvent::End, false), (TrackEvent::Error, true)] {
            let handler = TrackDone {
                errored,
                tx: tx.clone(),
            };
            match handle.add_event(Event::Track(event), handler) {
                Ok(()) => {}
                // Already played out and left the mixer.
                Err(ControlError::Finished) => finished_early = true,
                Err(e) => warn!(guild = %self.guild_id, error = %e, "Could not watch track"),
            }
        }

        let clip = Duration::from_millis(FRAME_DURATION_MS * frames.len() as u64);
        let result = if finished_early {
            Ok(())
        } else {
            let waited = wait_for_track(rx, clip + TRACK_GRACE).await;
            if waited.is_err() {
                let _ = handle.stop();
            }
            waited
        };
        if let Err(e) = tokio::fs::remove_file(&self.spool).await {
            warn!(path = %self.spool.display(), error = %e, "Failed to remove voice spool");
        }
        result
    }
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    async fn set_speaking(&mut self, speaking: bool) -> Result<()> {
        if speaking {
            self.pending.clear();
            return Ok(());
        }
        if self.pending.is_empty() {
            return Ok(());
        }
        debug!(guild = %self.guild_id, frames = self.pending.len(), "Handing clip to songbird");
        self.play_pending().await
    }

    async fn send_frame(&mut self, frame: Frame) -> Result<()> {
        self.pending.push(frame);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.manager
            .remove(self.guild_id)
            .await
            .map_err(|e| anyhow!("leave voice in guild {}: {e}", self.guild_id))
    }
}

/// `DCA1`, the little-endian metadata length, then the metadata JSON.
fn dca1_header() -> Result<Vec<u8>> {
    let metadata = json!({
        "dca": {
            "version": 1,
            "tool": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "url": null,
                "author": null,
            }
        },
        "opus": {
            "mode": "voip",
            "sample_rate": 48000,
            "frame_size": 960,
            "abr": null,
            "vbr": true,
            "channels": 2,
        },
        "info": null,
        "origin": null,
        "extra": null,
    });
    let body = serde_json::to_vec(&metadata)?;
    let len = i32::try_from(body.len()).context("DCA1 metadata too large")?;

    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(DCA1_MAGIC);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

//! Playback sequencer.
//!
//! One sound plays at a time across the whole process. A request that
//! arrives while another is in flight is refused immediately rather than
//! queued. Every request that gets past the busy check walks
//! `Joining → Speaking → Draining → Disconnecting → Idle`, and the lock is
//! released on every exit path, including errors and cancellation.

use std::time::Duration;

use mango_core::{Frame, PlaybackState, SoundError, SoundResult, VoiceConnection, VoiceGateway, VoiceTarget};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Pause after the last frame before leaving the channel.
    pub linger: Duration,
    /// Longest a single frame may wait on a backpressured sink.
    pub send_timeout: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            linger: Duration::from_millis(250),
            send_timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome of a completed playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackReport {
    pub frames_sent: usize,
    pub elapsed_ms: u64,
}

pub struct Player {
    config: PlayerConfig,
    busy: Mutex<()>,
    state: watch::Sender<PlaybackState>,
}

/// Puts the state back to `Idle` when a playback scope ends, however it ends.
struct IdleOnDrop<'a>(&'a watch::Sender<PlaybackState>);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_replace(PlaybackState::Idle);
    }
}

impl Player {
    pub fn new(config: PlayerConfig) -> Self {
        let (state, _) = watch::channel(PlaybackState::Idle);
        Self {
            config,
            busy: Mutex::new(()),
            state,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.try_lock().is_err()
    }

    /// Play `frames` into `target`.
    ///
    /// Fails fast with [`SoundError::PlaybackBusy`] if another playback holds
    /// the lock. Once joined, the connection is always disconnected before
    /// this returns.
    pub async fn play(
        &self,
        gateway: &dyn VoiceGateway,
        target: VoiceTarget,
        frames: Vec<Frame>,
    ) -> SoundResult<PlaybackReport> {
        let _busy = self.busy.try_lock().map_err(|_| {
            debug!(target = %target, "Playback refused; another sound is playing");
            SoundError::PlaybackBusy
        })?;
        // Declared after the lock guard so it drops first: observers see
        // Idle no later than the lock becomes free.
        let _idle = IdleOnDrop(&self.state);
        let started = Instant::now();

        self.transition(PlaybackState::Joining);
        let mut conn = gateway
            .join(target)
            .await
            .map_err(|e| SoundError::VoiceJoinFailed(format!("{e:#}")))?;
        info!(target = %target, gateway = gateway.name(), frames = frames.len(), "Joined voice channel");

        let streamed = self.stream(conn.as_mut(), frames).await;

        self.transition(PlaybackState::Disconnecting);
        tokio::time::sleep(self.config.linger).await;
        if let Err(e) = conn.disconnect().await {
            warn!(target = %target, error = %e, "Voice disconnect failed");
        }

        let frames_sent = streamed?;
        let report = PlaybackReport {
            frames_sent,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(target = %target, frames_sent, elapsed_ms = report.elapsed_ms, "Playback finished");
        Ok(report)
    }

    /// Speaking and Draining phases. Speaking is switched off even when a
    /// send fails part way.
    async fn stream(&self, conn: &mut dyn VoiceConnection, frames: Vec<Frame>) -> SoundResult<usize> {
        self.transition(PlaybackState::Speaking);
        conn.set_speaking(true).await?;

        let mut sent = 0;
        let mut failure = None;
        for frame in frames {
            match tokio::time::timeout(self.config.send_timeout, conn.send_frame(frame)).await {
                Ok(Ok(())) => sent += 1,
                Ok(Err(e)) => {
                    failure = Some(SoundError::Other(e));
                    break;
                }
                Err(_) => {
                    failure = Some(SoundError::SendTimeout(self.config.send_timeout));
                    break;
                }
            }
        }

        self.transition(PlaybackState::Draining);
        if let Err(e) = conn.set_speaking(false).await {
            warn!(error = %e, "Failed to clear speaking state");
        }

        match failure {
            Some(err) => {
                warn!(sent, error = %err, "Frame streaming aborted");
                Err(err)
            }
            None => Ok(sent),
        }
    }

    fn transition(&self, next: PlaybackState) {
        let prev = self.state.send_replace(next);
        debug!(from = %prev, to = %next, "Playback state");
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new(PlayerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex as StdMutex};
    use tokio::sync::Semaphore;

    type Log = Arc<StdMutex<Vec<String>>>;

    /// Records every call; optionally waits on `gate` before each frame.
    struct FakeConnection {
        log: Log,
        gate: Option<Arc<Semaphore>>,
        stall: bool,
        /// Refuse the frame at this index.
        reject_at: Option<usize>,
        sent: usize,
    }

    #[async_trait]
    impl VoiceConnection for FakeConnection {
        async fn set_speaking(&mut self, speaking: bool) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("speaking:{speaking}"));
            Ok(())
        }

        async fn send_frame(&mut self, frame: Frame) -> anyhow::Result<()> {
            if self.stall {
                std::future::pending::<()>().await;
            }
            if let Some(gate) = &self.gate {
                gate.acquire().await?.forget();
            }
            if self.reject_at == Some(self.sent) {
                anyhow::bail!("udp socket closed");
            }
            self.sent += 1;
            self.log.lock().unwrap().push(format!("frame:{}", frame.len()));
            Ok(())
        }

        async fn disconnect(&mut self) -> anyhow::Result<()> {
            self.log.lock().unwrap().push("disconnect".into());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct FakeGateway {
        log: Log,
        gate: Option<Arc<Semaphore>>,
        stall: bool,
        refuse: bool,
        reject_at: Option<usize>,
    }

    #[async_trait]
    impl VoiceGateway for FakeGateway {
        fn name(&self) -> &str {
            "fake"
        }

        async fn join(&self, target: VoiceTarget) -> anyhow::Result<Box<dyn VoiceConnection>> {
            if self.refuse {
                anyhow::bail!("missing permissions for {target}");
            }
            self.log.lock().unwrap().push(format!("join:{target}"));
            Ok(Box::new(FakeConnection {
                log: self.log.clone(),
                gate: self.gate.clone(),
                stall: self.stall,
                reject_at: self.reject_at,
                sent: 0,
            }))
        }
    }

    fn frames(lens: &[usize]) -> Vec<Frame> {
        lens.iter().map(|&n| Frame::from(vec![0xAB; n])).collect()
    }

    fn quick() -> PlayerConfig {
        PlayerConfig {
            linger: Duration::from_millis(250),
            send_timeout: Duration::from_millis(500),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn plays_frames_in_order_then_disconnects() {
        let gateway = FakeGateway::default();
        let player = Player::new(quick());

        let report = player
            .play(&gateway, VoiceTarget::new(1, 2), frames(&[3, 1, 2]))
            .await
            .unwrap();

        assert_eq!(report.frames_sent, 3);
        assert!(report.elapsed_ms >= 250);
        assert_eq!(
            *gateway.log.lock().unwrap(),
            vec!["join:1/2", "speaking:true", "frame:3", "frame:1", "frame:2", "speaking:false", "disconnect"]
        );
        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(!player.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_sound_still_joins_and_leaves() {
        let gateway = FakeGateway::default();
        let player = Player::new(quick());

        let report = player.play(&gateway, VoiceTarget::new(1, 2), vec![]).await.unwrap();
        assert_eq!(report.frames_sent, 0);
        assert_eq!(
            *gateway.log.lock().unwrap(),
            vec!["join:1/2", "speaking:true", "speaking:false", "disconnect"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn second_request_is_refused_while_busy() {
        let gate = Arc::new(Semaphore::new(0));
        let gateway = Arc::new(FakeGateway {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let player = Arc::new(Player::new(quick()));
        let mut states = player.subscribe();

        let first = {
            let player = player.clone();
            let gateway = gateway.clone();
            tokio::spawn(async move { player.play(gateway.as_ref(), VoiceTarget::new(1, 2), frames(&[4, 4])).await })
        };

        states.wait_for(|s| *s == PlaybackState::Speaking).await.unwrap();
        assert!(player.is_busy());

        let err = player
            .play(gateway.as_ref(), VoiceTarget::new(1, 3), frames(&[4]))
            .await
            .unwrap_err();
        assert!(matches!(err, SoundError::PlaybackBusy));

        gate.add_permits(2);
        let report = first.await.unwrap().unwrap();
        assert_eq!(report.frames_sent, 2);
        assert_eq!(player.state(), PlaybackState::Idle);

        // Only the first request ever joined.
        let joins = gateway
            .log
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.starts_with("join"))
            .count();
        assert_eq!(joins, 1);

        gate.add_permits(1);
        let report = player
            .play(gateway.as_ref(), VoiceTarget::new(1, 3), frames(&[4]))
            .await
            .unwrap();
        assert_eq!(report.frames_sent, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn join_failure_returns_to_idle() {
        let gateway = FakeGateway {
            refuse: true,
            ..Default::default()
        };
        let player = Player::new(quick());

        let err = player
            .play(&gateway, VoiceTarget::new(1, 2), frames(&[1]))
            .await
            .unwrap_err();
        match err {
            SoundError::VoiceJoinFailed(msg) => assert!(msg.contains("missing permissions")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(!player.is_busy());
        assert!(gateway.log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_sink_times_out_and_still_disconnects() {
        let gateway = FakeGateway {
            stall: true,
            ..Default::default()
        };
        let player = Player::new(quick());

        let err = player
            .play(&gateway, VoiceTarget::new(1, 2), frames(&[1, 1]))
            .await
            .unwrap_err();
        assert!(matches!(err, SoundError::SendTimeout(d) if d == Duration::from_millis(500)));
        assert_eq!(
            *gateway.log.lock().unwrap(),
            vec!["join:1/2", "speaking:true", "speaking:false", "disconnect"]
        );
        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(!player.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_frame_stops_stream_and_still_disconnects() {
        let gateway = FakeGateway {
            reject_at: Some(1),
            ..Default::default()
        };
        let player = Player::new(quick());

        let err = player
            .play(&gateway, VoiceTarget::new(1, 2), frames(&[2, 3, 4]))
            .await
            .unwrap_err();
        match err {
            SoundError::Other(e) => assert!(e.to_string().contains("udp socket closed")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            *gateway.log.lock().unwrap(),
            vec!["join:1/2", "speaking:true", "frame:2", "speaking:false", "disconnect"]
        );
        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(!player.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_playback_releases_lock() {
        let gateway = Arc::new(FakeGateway {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Default::default()
        });
        let player = Arc::new(Player::new(quick()));
        let mut states = player.subscribe();

        let task = {
            let player = player.clone();
            let gateway = gateway.clone();
            tokio::spawn(async move { player.play(gateway.as_ref(), VoiceTarget::new(1, 2), frames(&[1])).await })
        };
        states.wait_for(|s| *s == PlaybackState::Speaking).await.unwrap();
        task.abort();
        let _ = task.await;

        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(!player.is_busy());
    }
}

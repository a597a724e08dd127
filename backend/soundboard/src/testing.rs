//! Shared test doubles.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mango_core::{Frame, SoundError, SoundResult, VoiceConnection, VoiceGateway, VoiceTarget};
use mango_media::{Downloader, Transcoder, dca};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mango-sb-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// A valid DCA stream of `n` three-byte frames.
pub fn dca_bytes(n: usize) -> Vec<u8> {
    let frames: Vec<Frame> = (0..n).map(|i| Frame::from(vec![i as u8; 3])).collect();
    dca::encode_to_vec(&frames).unwrap()
}

/// Writes a one-frame DCA file instead of running ffmpeg.
#[derive(Default)]
pub struct FakeTranscoder {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeTranscoder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    fn name(&self) -> &str {
        "fake"
    }

    async fn transcode(&self, _input: &Path, output: &Path) -> SoundResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SoundError::TranscodeFailed("ffmpeg exited with 1".into()));
        }
        tokio::fs::create_dir_all(output.parent().unwrap()).await?;
        tokio::fs::write(output, dca_bytes(1)).await?;
        Ok(())
    }
}

/// Records joins and frames; never touches the network.
#[derive(Default)]
pub struct FakeGateway {
    pub joins: Mutex<Vec<VoiceTarget>>,
    pub frames: std::sync::Arc<AtomicUsize>,
}

struct FakeConnection {
    frames: std::sync::Arc<AtomicUsize>,
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    async fn set_speaking(&mut self, _speaking: bool) -> anyhow::Result<()> {
        Ok(())
    }

    async fn send_frame(&mut self, _frame: Frame) -> anyhow::Result<()> {
        self.frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl VoiceGateway for FakeGateway {
    fn name(&self) -> &str {
        "fake"
    }

    async fn join(&self, target: VoiceTarget) -> anyhow::Result<Box<dyn VoiceConnection>> {
        self.joins.lock().unwrap().push(target);
        Ok(Box::new(FakeConnection {
            frames: self.frames.clone(),
        }))
    }
}

/// Serve `body` once over plain HTTP/1.1 and return the URL.
pub async fn serve_once(status: &'static str, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let _ = socket.write_all(head.as_bytes()).await;
        let _ = socket.write_all(&body).await;
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}/attachments/upload")
}

/// Accept one request and sit on it for `hold` without answering.
pub async fn serve_stalled(hold: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(hold).await;
        drop(socket);
    });
    format!("http://{addr}/attachments/slow")
}

pub fn local_downloader(max_bytes: u64) -> Downloader {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .no_proxy()
        .build()
        .unwrap();
    Downloader::with_client(client, max_bytes)
}

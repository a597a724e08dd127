//! DCA frame container codec.
//!
//! A DCA (v0) file is a bare sequence of records, each a little-endian `i16`
//! payload length followed by that many bytes of Opus packet. There is no
//! header, footer, or checksum.

use std::path::Path;

use mango_core::{Frame, SoundError, SoundResult};
use serde::Serialize;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tracing::debug;

/// Upper bound on a single frame's payload.
///
/// An Opus packet is at most 1275 bytes per 20 ms frame; anything far past
/// that comes from a corrupt or hostile upload.
pub const MAX_FRAME_LEN: usize = 4000;

/// Playback time covered by one frame as produced by the `dca` packager.
pub const FRAME_DURATION_MS: u64 = 20;

/// Decode the DCA file at `path` into its frames, in file order.
pub async fn decode(path: impl AsRef<Path>) -> SoundResult<Vec<Frame>> {
    let path = path.as_ref();
    let file = File::open(path).await?;
    let frames = decode_from(BufReader::new(file)).await?;
    debug!(path = %path.display(), frames = frames.len(), "Decoded DCA file");
    Ok(frames)
}

/// Decode frames from any async byte source until a clean end of stream.
pub async fn decode_from<R: AsyncRead + Unpin>(mut reader: R) -> SoundResult<Vec<Frame>> {
    let mut frames = Vec::new();
    let mut offset: u64 = 0;

    loop {
        let mut len_buf = [0u8; 2];
        match read_full(&mut reader, &mut len_buf).await? {
            0 => break,
            2 => {}
            _ => return Err(SoundError::TruncatedFrame { offset }),
        }

        let length = i16::from_le_bytes(len_buf);
        if length < 0 || length as usize > MAX_FRAME_LEN {
            return Err(SoundError::CorruptFrameLength { length, offset });
        }

        let mut payload = vec![0u8; length as usize];
        if read_full(&mut reader, &mut payload).await? < payload.len() {
            return Err(SoundError::TruncatedFrame { offset });
        }

        frames.push(Frame::from(payload));
        offset += 2 + length as u64;
    }

    Ok(frames)
}

/// Fill `buf` as far as the stream allows; returns how many bytes were read.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Write `frames` in DCA layout.
pub async fn encode_to<W: AsyncWrite + Unpin>(frames: &[Frame], writer: &mut W) -> SoundResult<()> {
    for (index, frame) in frames.iter().enumerate() {
        let length = frame_length(index, frame)?;
        writer.write_all(&length.to_le_bytes()).await?;
        writer.write_all(frame.as_bytes()).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Encode `frames` into an in-memory DCA buffer.
pub fn encode_to_vec(frames: &[Frame]) -> SoundResult<Vec<u8>> {
    let total: usize = frames.iter().map(|f| 2 + f.len()).sum();
    let mut out = Vec::with_capacity(total);
    for (index, frame) in frames.iter().enumerate() {
        let length = frame_length(index, frame)?;
        out.extend_from_slice(&length.to_le_bytes());
        out.extend_from_slice(frame.as_bytes());
    }
    Ok(out)
}

/// Write `frames` to a new DCA file at `path`.
pub async fn write_file(path: impl AsRef<Path>, frames: &[Frame]) -> SoundResult<()> {
    let file = File::create(path.as_ref()).await?;
    let mut writer = BufWriter::new(file);
    encode_to(frames, &mut writer).await
}

fn frame_length(index: usize, frame: &Frame) -> SoundResult<i16> {
    if frame.len() > MAX_FRAME_LEN {
        return Err(SoundError::Other(anyhow::anyhow!(
            "frame {index} is {} bytes, limit is {MAX_FRAME_LEN}",
            frame.len()
        )));
    }
    Ok(frame.len() as i16)
}

/// Summary of a decoded frame sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub frames: usize,
    pub total_bytes: usize,
    pub max_frame_len: usize,
    pub duration_ms: u64,
}

impl FrameStats {
    pub fn from_frames(frames: &[Frame]) -> Self {
        Self {
            frames: frames.len(),
            total_bytes: frames.iter().map(Frame::len).sum(),
            max_frame_len: frames.iter().map(Frame::len).max().unwrap_or(0),
            duration_ms: frames.len() as u64 * FRAME_DURATION_MS,
        }
    }
}

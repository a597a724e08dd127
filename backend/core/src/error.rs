use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Error taxonomy shared by every rocket-mango crate.
///
/// None of these are fatal to the process; callers report them back to the
/// requesting channel or log them and carry on.
#[derive(Debug, Error)]
pub enum SoundError {
    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    #[error("directory unavailable: {}", path.display())]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("truncated frame at byte offset {offset}")]
    TruncatedFrame { offset: u64 },

    #[error("corrupt frame length {length} at byte offset {offset}")]
    CorruptFrameLength { length: i16, offset: u64 },

    #[error("voice join failed: {0}")]
    VoiceJoinFailed(String),

    #[error("voice sink stalled for {0:?}")]
    SendTimeout(Duration),

    #[error("transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("{0} is already a command")]
    DuplicateCommand(String),

    #[error("playback already in progress")]
    PlaybackBusy,

    #[error("requester is not in a voice channel")]
    NotInVoiceChannel,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SoundResult<T> = Result<T, SoundError>;

impl SoundError {
    /// Wrap an io error from opening or walking `path`.
    pub fn directory(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Whether the error is a framing problem in a DCA stream.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            Self::TruncatedFrame { .. } | Self::CorruptFrameLength { .. }
        )
    }
}

//! Sound file handling for rocket-mango: naming, discovery, the DCA frame
//! container, and conversion of uploads into it.

pub mod dca;
pub mod download;
pub mod filename;
pub mod mime_detect;
pub mod normalize;
pub mod scan;
pub mod transcode;

pub use dca::{FrameStats, MAX_FRAME_LEN, decode, encode_to_vec};
pub use download::Downloader;
pub use filename::{FRAME_CONTAINER_EXT, FileName, command_name, is_frame_container, tokenize};
pub use mime_detect::{detect_mime_type, is_audio, is_ingestible, is_video};
pub use normalize::Normalizer;
pub use scan::list_files;
pub use transcode::{FfmpegDcaTranscoder, PipelineConfig, Transcoder};

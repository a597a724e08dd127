//! MIME type detection for uploaded sound files.
//!
//! Used to refuse attachments the transcoder cannot make sense of before
//! spending a download on them.

use std::path::Path;

/// Detect MIME type by file extension.
pub fn detect_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        // Audio
        "mp3"          => "audio/mpeg",
        "ogg" | "oga"  => "audio/ogg",
        "wav"          => "audio/wav",
        "flac"         => "audio/flac",
        "m4a"          => "audio/mp4",
        "opus"         => "audio/opus",
        "aac"          => "audio/aac",
        "wma"          => "audio/x-ms-wma",
        "aiff" | "aif" => "audio/aiff",

        // Pre-encoded Opus frame container
        "dca"          => "audio/x-dca",

        // Video (ffmpeg pulls the audio track out)
        "mp4"          => "video/mp4",
        "webm"         => "video/webm",
        "mkv"          => "video/x-matroska",
        "mov"          => "video/quicktime",
        "avi"          => "video/x-msvideo",

        _              => "application/octet-stream",
    }
}

/// Whether a MIME type is for audio.
pub fn is_audio(mime: &str) -> bool {
    mime.starts_with("audio/")
}

/// Whether a MIME type is for video.
pub fn is_video(mime: &str) -> bool {
    mime.starts_with("video/")
}

/// Whether an uploaded file can become a sound command.
pub fn is_ingestible(path: &Path) -> bool {
    let mime = detect_mime_type(path);
    is_audio(mime) || is_video(mime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_mp3() {
        assert_eq!(detect_mime_type(&PathBuf::from("airhorn.mp3")), "audio/mpeg");
    }

    #[test]
    fn dca_is_ingestible() {
        assert!(is_ingestible(&PathBuf::from("bruh.DCA")));
    }

    #[test]
    fn video_is_ingestible() {
        assert!(is_ingestible(&PathBuf::from("clip.webm")));
    }

    #[test]
    fn unknown_extension_is_refused() {
        assert_eq!(detect_mime_type(&PathBuf::from("notes.txt")), "application/octet-stream");
        assert!(!is_ingestible(&PathBuf::from("notes.txt")));
        assert!(!is_ingestible(&PathBuf::from("noext")));
    }
}

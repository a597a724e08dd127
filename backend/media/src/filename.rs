//! Filename tokenizer.
//!
//! Command names are derived from file paths by splitting on every run of
//! non-alphanumeric characters: the last token is the extension and the one
//! before it is the stem. `sounds/dca/air-horn_v2.dca` therefore yields the
//! stem `v2`, not `air-horn_v2`.

use std::path::Path;
use std::sync::LazyLock;

use mango_core::{SoundError, SoundResult};
use regex::Regex;

/// Extension of the length-prefixed Opus frame container.
pub const FRAME_CONTAINER_EXT: &str = "dca";

static NON_ALNUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());

/// Split `input` into its ordered, non-empty alphanumeric tokens.
pub fn tokenize(input: &str) -> Vec<String> {
    NON_ALNUM_RE
        .split(input)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// A tokenized file path with at least a stem and an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileName {
    tokens: Vec<String>,
}

impl FileName {
    pub fn parse(path: impl AsRef<Path>) -> SoundResult<Self> {
        let raw = path.as_ref().to_string_lossy();
        let tokens = tokenize(&raw);
        if tokens.len() < 2 {
            return Err(SoundError::InvalidFilename(raw.into_owned()));
        }
        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn stem(&self) -> &str {
        &self.tokens[self.tokens.len() - 2]
    }

    pub fn extension(&self) -> &str {
        &self.tokens[self.tokens.len() - 1]
    }

    pub fn is_frame_container(&self) -> bool {
        self.extension().eq_ignore_ascii_case(FRAME_CONTAINER_EXT)
    }
}

/// Command name (without marker) for a sound file.
pub fn command_name(path: impl AsRef<Path>) -> SoundResult<String> {
    Ok(FileName::parse(path)?.stem().to_string())
}

/// Whether the file is already in the frame-container format.
pub fn is_frame_container(path: impl AsRef<Path>) -> SoundResult<bool> {
    Ok(FileName::parse(path)?.is_frame_container())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_delimiter_stem_takes_last_segment() {
        let name = FileName::parse("sounds/dca/air-horn_v2.dca").unwrap();
        assert_eq!(name.tokens(), &["sounds", "dca", "air", "horn", "v2", "dca"]);
        assert_eq!(name.stem(), "v2");
        assert_eq!(name.extension(), "dca");
        assert!(name.is_frame_container());
    }

    #[test]
    fn leading_and_repeated_delimiters_are_dropped() {
        assert_eq!(tokenize("./sounds//staging/bruh.mp3"), vec!["sounds", "staging", "bruh", "mp3"]);
    }

    #[test]
    fn plain_filename() {
        assert_eq!(command_name("airhorn.mp3").unwrap(), "airhorn");
        assert!(!is_frame_container("airhorn.mp3").unwrap());
        assert!(is_frame_container("AIRHORN.DCA").unwrap());
    }

    #[test]
    fn single_token_is_invalid() {
        assert!(matches!(FileName::parse("README"), Err(SoundError::InvalidFilename(_))));
        assert!(matches!(FileName::parse("..."), Err(SoundError::InvalidFilename(_))));
        assert!(matches!(FileName::parse(""), Err(SoundError::InvalidFilename(_))));
    }

    #[test]
    fn non_ascii_characters_split() {
        assert_eq!(command_name("sounds/café.ogg").unwrap(), "caf");
    }
}

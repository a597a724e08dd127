/// Sound table: command token to encoded sound file.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mango_core::{SoundError, SoundResult};

use crate::types::{BuiltinCommand, DEFAULT_MARKER};

/// Registered sounds, keyed by marker-prefixed command (`!airhorn`).
///
/// Keys are unique and never collide with a [`BuiltinCommand`]. Iteration is
/// in sorted order so listings are stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundTable {
    marker: char,
    entries: BTreeMap<String, PathBuf>,
}

impl SoundTable {
    pub fn new(marker: char) -> Self {
        Self {
            marker,
            entries: BTreeMap::new(),
        }
    }

    pub fn marker(&self) -> char {
        self.marker
    }

    /// Prefix `command` with the marker unless it already carries one.
    pub fn normalize(&self, command: &str) -> String {
        if command.starts_with(self.marker) {
            command.to_string()
        } else {
            format!("{}{}", self.marker, command)
        }
    }

    /// Whether `command` names a built-in.
    pub fn is_reserved(&self, command: &str) -> bool {
        let key = self.normalize(command);
        BuiltinCommand::from_name(&key[self.marker.len_utf8()..]).is_some()
    }

    /// Register `command` for `path`.
    ///
    /// Returns `false`, leaving the table untouched, when the command is
    /// empty, reserved, or already present.
    pub fn register(&mut self, command: &str, path: impl Into<PathBuf>) -> bool {
        let key = self.normalize(command);
        if key.len() == self.marker.len_utf8() || self.is_reserved(&key) {
            return false;
        }
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, path.into());
        true
    }

    /// Like [`register`](Self::register), but reports a refusal as
    /// [`SoundError::DuplicateCommand`]. Built-ins count as taken.
    pub fn try_register(&mut self, command: &str, path: impl Into<PathBuf>) -> SoundResult<String> {
        let key = self.normalize(command);
        if self.register(&key, path) {
            Ok(key)
        } else {
            Err(SoundError::DuplicateCommand(key))
        }
    }

    /// Resolve a chat message to a sound path by its first word.
    pub fn lookup(&self, text: &str) -> Option<&Path> {
        let word = text.split_whitespace().next()?;
        self.entries.get(word).map(PathBuf::as_path)
    }

    pub fn get(&self, command: &str) -> Option<&Path> {
        self.entries.get(&self.normalize(command)).map(PathBuf::as_path)
    }

    pub fn contains(&self, command: &str) -> bool {
        self.entries.contains_key(&self.normalize(command))
    }

    /// Registered commands in sorted order.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SoundTable {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}
